//! src/authentication/sender.rs

use super::internal_token::{validate_internal_token, TIMESTAMP_HEADER, TOKEN_HEADER};
use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use std::future::{ready, Ready};

pub const API_KEY_HEADER: &str = "x-api-key";

/// The provider API key, shared with the send endpoint as `web::Data`.
#[derive(Clone)]
pub struct SendApiKey(pub Secret<String>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApiKey,
    InternalToken,
}

/// Extracting this proves the request carried either the API key or a fresh
/// internal token.
#[derive(Debug)]
pub struct AuthenticatedSender(pub AuthMethod);

#[derive(thiserror::Error, Debug)]
pub enum SendAuthError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("The send API key is not configured")]
    MissingKey,
}

impl ResponseError for SendAuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingKey => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

pub fn authenticate(req: &HttpRequest, api_key: &Secret<String>) -> Result<AuthMethod, SendAuthError> {
    let presented_key = header(req, API_KEY_HEADER);
    let timestamp = header(req, TIMESTAMP_HEADER);
    let token = header(req, TOKEN_HEADER);

    tracing::debug!(
        api_key_present = presented_key.is_some(),
        timestamp = timestamp.unwrap_or("missing"),
        internal_token_present = token.is_some(),
        "Checking send credentials"
    );

    if presented_key == Some(api_key.expose_secret().as_str()) {
        return Ok(AuthMethod::ApiKey);
    }
    if validate_internal_token(timestamp, token, api_key, Utc::now().timestamp_millis()) {
        return Ok(AuthMethod::InternalToken);
    }
    tracing::info!("Rejected send request with invalid credentials");
    Err(SendAuthError::Unauthorized)
}

impl FromRequest for AuthenticatedSender {
    type Error = SendAuthError;
    type Future = Ready<Result<AuthenticatedSender, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<SendApiKey>>() {
            Some(key) => authenticate(req, &key.0).map(AuthenticatedSender),
            None => Err(SendAuthError::MissingKey),
        };
        ready(result)
    }
}
