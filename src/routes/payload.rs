//! src/routes/payload.rs

use crate::utils::error_chain_fmt;
use actix_web::error::{JsonPayloadError, UrlencodedError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};

/// A request body the extractor could not read. Keeps unreadable bodies on
/// the same JSON failure shapes as the handlers' own errors.
#[derive(thiserror::Error)]
pub enum PayloadError {
    #[error("Internal server error")]
    Json(#[source] JsonPayloadError),
    #[error("Invalid form submission. Please try again.")]
    Form(#[source] UrlencodedError),
}

impl std::fmt::Debug for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        match self {
            // The send API has always answered unreadable bodies with a 500.
            Self::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Form(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::Json(_) => serde_json::json!({ "success": false, "error": self.to_string() }),
            Self::Form(_) => serde_json::json!({ "success": false, "message": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(path = %req.path(), error.cause_chain = ?err, "Rejected an unreadable JSON body");
    PayloadError::Json(err).into()
}

pub fn form_error_handler(err: UrlencodedError, req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(path = %req.path(), error.cause_chain = ?err, "Rejected an unreadable form body");
    PayloadError::Form(err).into()
}
