//! src/routes/subscriptions.rs

use crate::domain::{NewSubscriber, SubscriberEmail, SubscriberName, SubscriberSource, SubscriberStatus};
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
    pub email: String,
    #[serde(default, alias = "firstName")]
    pub first_name: Option<String>,
    #[serde(default, alias = "lastName")]
    pub last_name: Option<String>,
}

impl FormData {
    pub fn into_new_subscriber(self, source: SubscriberSource) -> Result<NewSubscriber, String> {
        let email = SubscriberEmail::parse(self.email)?;
        let first_name = SubscriberName::parse_optional(self.first_name)?;
        let last_name = SubscriberName::parse_optional(self.last_name)?;
        Ok(NewSubscriber {
            email,
            first_name,
            last_name,
            source,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub status: SubscriberStatus,
}

pub enum SubscriptionOutcome {
    Created(SubscriberRecord),
    Existing(SubscriberRecord),
}

impl SubscriptionOutcome {
    pub fn record(&self) -> &SubscriberRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Self::Existing(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Created(_) => "Successfully subscribed! Your eBook is on the way!",
            Self::Existing(_) => "Welcome back! You are already subscribed.",
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: SubscriberRecord,
    pub is_existing_subscriber: bool,
}

impl From<SubscriptionOutcome> for SubscribeResponse {
    fn from(outcome: SubscriptionOutcome) -> Self {
        let message = outcome.message();
        let is_existing_subscriber = outcome.is_existing();
        let data = match outcome {
            SubscriptionOutcome::Created(record) | SubscriptionOutcome::Existing(record) => record,
        };
        Self {
            success: true,
            message,
            data,
            is_existing_subscriber,
        }
    }
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("An unexpected error occurred. Please try again.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
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
    name = "Adding a new subscriber",
    skip(form, pool),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscriber = form
        .0
        .into_new_subscriber(SubscriberSource::Website)
        .map_err(SubscribeError::ValidationError)?;
    let outcome = register_subscriber(&pool, &new_subscriber).await?;
    Ok(HttpResponse::Ok().json(SubscribeResponse::from(outcome)))
}

/// Insert the subscriber unless the email is already on file. A concurrent
/// signup that wins the insert is reported as an existing subscriber.
#[tracing::instrument(name = "Registering subscriber", skip(pool, new_subscriber))]
pub async fn register_subscriber(
    pool: &PgPool,
    new_subscriber: &NewSubscriber,
) -> Result<SubscriptionOutcome, anyhow::Error> {
    let email = new_subscriber.email.as_ref();
    if let Some(existing) = find_subscriber_by_email(pool, email)
        .await
        .context("Failed to look up the subscriber")?
    {
        return Ok(SubscriptionOutcome::Existing(existing));
    }

    // `None` means a concurrent request inserted the same email first.
    match insert_subscriber(pool, new_subscriber)
        .await
        .context("Failed to insert the new subscriber")?
    {
        Some(created) => Ok(SubscriptionOutcome::Created(created)),
        None => {
            tracing::info!("Lost a concurrent signup race, reusing the existing subscriber");
            let existing = find_subscriber_by_email(pool, email)
                .await
                .context("Failed to look up the subscriber")?
                .context("The conflicting subscriber row disappeared")?;
            Ok(SubscriptionOutcome::Existing(existing))
        }
    }
}

#[tracing::instrument(name = "Finding subscriber by email", skip(pool, email))]
pub async fn find_subscriber_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<SubscriberRecord>, sqlx::Error> {
    sqlx::query_as::<_, SubscriberRecord>(
        r#"
        SELECT id, email, first_name, last_name, status
        FROM subscribers
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {:?}", e);
        e
    })
}

#[tracing::instrument(
    name = "Saving new subscriber details into database",
    skip(pool, new_subscriber)
)]
pub async fn insert_subscriber(
    pool: &PgPool,
    new_subscriber: &NewSubscriber,
) -> Result<Option<SubscriberRecord>, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, SubscriberRecord>(
        r#"
        INSERT INTO subscribers (id, email, first_name, last_name, status, source, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT (email) DO NOTHING
        RETURNING id, email, first_name, last_name, status
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new_subscriber.email.as_ref())
    .bind(new_subscriber.first_name.as_ref().map(|n| n.as_ref()))
    .bind(new_subscriber.last_name.as_ref().map(|n| n.as_ref()))
    .bind(SubscriberStatus::Active)
    .bind(new_subscriber.source.as_str())
    .bind(now)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {:?}", e);
        e
    })
}
