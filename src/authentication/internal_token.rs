//! src/authentication/internal_token.rs
//!
//! Request signing for calls the service makes to its own `/api/send`
//! endpoint. The token is a 32-bit string hash of the timestamp and the
//! provider API key, so it only proves that the caller knows the key and
//! signed recently. It is not a MAC.

use chrono::Utc;
use secrecy::{ExposeSecret, Secret};

pub const TIMESTAMP_HEADER: &str = "x-internal-timestamp";
pub const TOKEN_HEADER: &str = "x-internal-token";

/// Tokens are accepted for five minutes after the signing time.
pub const FRESHNESS_WINDOW_MS: i64 = 5 * 60 * 1000;

/// 31-multiplier rolling hash over UTF-16 code units, wrapping at 32 bits.
pub fn string_hash(input: &str) -> i32 {
    input
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        })
}

pub fn generate_internal_token(timestamp: &str, api_key: &Secret<String>) -> String {
    let secret_data = format!("{}-{}-internal-auth", timestamp, api_key.expose_secret());
    format!("{:x}", string_hash(&secret_data).unsigned_abs())
}

/// Current time in milliseconds since the epoch, as sent in
/// `x-internal-timestamp`.
pub fn current_timestamp() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// Returns a `(timestamp, token)` header pair signed now.
pub fn sign_request(api_key: &Secret<String>) -> (String, String) {
    let timestamp = current_timestamp();
    let token = generate_internal_token(&timestamp, api_key);
    (timestamp, token)
}

pub fn validate_internal_token(
    timestamp: Option<&str>,
    token: Option<&str>,
    api_key: &Secret<String>,
    now_ms: i64,
) -> bool {
    let (Some(timestamp), Some(token)) = (timestamp, token) else {
        return false;
    };
    let Ok(signed_at) = timestamp.trim().parse::<i64>() else {
        return false;
    };
    // Only age is bounded; a sender clock running ahead is tolerated.
    if now_ms.saturating_sub(signed_at) > FRESHNESS_WINDOW_MS {
        return false;
    }
    token == generate_internal_token(timestamp, api_key)
}
