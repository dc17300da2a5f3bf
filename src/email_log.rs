//! src/email_log.rs

use crate::domain::{EmailMetadata, EmailStatus};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// One send attempt. Ids that don't parse as UUIDs are stored as null, the
/// same as ids that were never given.
#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub subscriber_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub status: EmailStatus,
    pub message_id: Option<String>,
    pub error: Option<serde_json::Value>,
}

impl NewEmailLog {
    pub fn sent(subscriber_id: Option<Uuid>, campaign_id: Option<Uuid>, message_id: String) -> Self {
        Self {
            subscriber_id,
            campaign_id,
            status: EmailStatus::Sent,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(
        subscriber_id: Option<Uuid>,
        campaign_id: Option<Uuid>,
        error: serde_json::Value,
    ) -> Self {
        Self {
            subscriber_id,
            campaign_id,
            status: EmailStatus::Failed,
            message_id: None,
            error: Some(error),
        }
    }
}

pub fn parse_record_id(raw: Option<&str>) -> Option<Uuid> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::warn!(id = raw, "Ignoring a record id that is not a UUID");
            None
        }
    }
}

#[tracing::instrument(
    name = "Saving email log",
    skip(pool, entry),
    fields(status = %entry.status)
)]
pub async fn insert_email_log(pool: &PgPool, entry: &NewEmailLog) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    let error = entry.error.as_ref().map(|e| e.to_string());
    sqlx::query(
        r#"
        INSERT INTO email_logs (id, subscriber_id, campaign_id, status, message_id, error, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(entry.subscriber_id)
    .bind(entry.campaign_id)
    .bind(entry.status)
    .bind(entry.message_id.as_deref())
    .bind(error)
    .bind(Json(EmailMetadata::default()))
    .execute(pool)
    .await?;
    Ok(id)
}

/// Log a send attempt. A logging failure never fails the send itself.
pub async fn record_delivery(pool: &PgPool, entry: NewEmailLog) -> bool {
    match insert_email_log(pool, &entry).await {
        Ok(_) => {
            tracing::info!(status = %entry.status, "Email logged");
            true
        }
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "Failed to log email");
            false
        }
    }
}
