//! src/routes/unsubscribe/post.rs

use crate::domain::{SubscriberEmail, SubscriberStatus};
use crate::routes::find_subscriber_by_email;
use crate::turnstile::TurnstileClient;
use crate::utils::error_chain_fmt;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(serde::Deserialize)]
pub struct FormData {
    #[serde(default)]
    email: String,
    #[serde(default, alias = "turnstileToken", alias = "cf-turnstile-response")]
    turnstile_token: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct UnsubscribeResponse {
    success: bool,
    message: &'static str,
    already_unsubscribed: bool,
}

#[derive(thiserror::Error)]
pub enum UnsubscribeError {
    #[error("CAPTCHA verification failed. Please try again.")]
    CaptchaFailed,
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("We couldn't find that email address in our system.")]
    NotFound,
    #[error("An unexpected error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for UnsubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UnsubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::CaptchaFailed | Self::InvalidEmail => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }))
    }
}

#[tracing::instrument(
    name = "Unsubscribing a subscriber",
    skip(form, pool, turnstile),
    fields(subscriber_email = %form.email)
)]
pub async fn unsubscribe(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
    turnstile: web::Data<TurnstileClient>,
) -> Result<HttpResponse, UnsubscribeError> {
    let FormData {
        email,
        turnstile_token,
    } = form.0;
    // The captcha gates everything, including email validation.
    if turnstile_token.trim().is_empty() || !turnstile.verify(&turnstile_token).await {
        return Err(UnsubscribeError::CaptchaFailed);
    }
    let email = SubscriberEmail::parse(email).map_err(|_| UnsubscribeError::InvalidEmail)?;

    let subscriber = find_subscriber_by_email(&pool, email.as_ref())
        .await
        .context("Failed to look up the subscriber")?
        .ok_or(UnsubscribeError::NotFound)?;

    if subscriber.status == SubscriberStatus::Unsubscribed {
        return Ok(HttpResponse::Ok().json(UnsubscribeResponse {
            success: true,
            message: "You've already been unsubscribed from our mailing list.",
            already_unsubscribed: true,
        }));
    }

    mark_unsubscribed(&pool, subscriber.id)
        .await
        .context("Failed to update the subscriber status")?;

    Ok(HttpResponse::Ok().json(UnsubscribeResponse {
        success: true,
        message: "You've been successfully unsubscribed from our mailing list.",
        already_unsubscribed: false,
    }))
}

#[tracing::instrument(name = "Marking subscriber as unsubscribed", skip(pool))]
pub async fn mark_unsubscribed(pool: &PgPool, subscriber_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(r#"UPDATE subscribers SET status = $1, updated_at = $2 WHERE id = $3"#)
        .bind(SubscriberStatus::Unsubscribed)
        .bind(Utc::now())
        .bind(subscriber_id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to execute query: {:?}", e);
            e
        })?;
    Ok(())
}
