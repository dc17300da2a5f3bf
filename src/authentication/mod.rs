//! src/authentication/mod.rs

mod internal_token;
mod sender;

pub use internal_token::{
    current_timestamp, generate_internal_token, sign_request, string_hash,
    validate_internal_token, FRESHNESS_WINDOW_MS, TIMESTAMP_HEADER, TOKEN_HEADER,
};
pub use sender::{authenticate, AuthMethod, AuthenticatedSender, SendApiKey, SendAuthError, API_KEY_HEADER};
