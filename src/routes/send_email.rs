//! src/routes/send_email.rs

use crate::authentication::AuthenticatedSender;
use crate::email_client::{EmailClient, EmailClientError, OutgoingEmail, Recipients};
use crate::email_log::{parse_record_id, record_delivery, NewEmailLog};
use crate::utils::error_chain_fmt;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use sqlx::PgPool;

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailBody {
    #[serde(default)]
    to: Option<Recipients>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    html: String,
    from: Option<String>,
    cc: Option<Recipients>,
    bcc: Option<Recipients>,
    reply_to: Option<String>,
    attachments: Option<Vec<serde_json::Value>>,
    subscriber_id: Option<String>,
    campaign_id: Option<String>,
}

#[derive(serde::Serialize)]
struct SentData {
    id: String,
}

#[derive(thiserror::Error)]
pub enum SendEmailError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("The email provider rejected the message")]
    Rejected {
        status: StatusCode,
        error: serde_json::Value,
    },
    #[error("Internal server error")]
    UnexpectedError(#[source] EmailClientError),
}

impl std::fmt::Debug for SendEmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SendEmailError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::MissingFields => serde_json::json!({ "error": self.to_string() }),
            Self::Rejected { error, .. } => serde_json::json!({ "success": false, "error": error }),
            Self::UnexpectedError(_) => {
                serde_json::json!({ "success": false, "error": self.to_string() })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Deliver caller-supplied HTML through the provider and log the attempt.
#[tracing::instrument(
    name = "Handling a send request",
    skip(sender, body, pool, email_client),
    fields(auth_method = ?sender.0, subject = %body.subject)
)]
pub async fn send_email(
    sender: AuthenticatedSender,
    body: web::Json<SendEmailBody>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, SendEmailError> {
    let body = body.into_inner();
    let to = match body.to {
        Some(to) if !to.is_empty() => to,
        _ => return Err(SendEmailError::MissingFields),
    };
    if body.subject.is_empty() || body.html.is_empty() {
        return Err(SendEmailError::MissingFields);
    }
    // Malformed ids are logged as null rather than failing the send.
    let subscriber_id = parse_record_id(body.subscriber_id.as_deref());
    let campaign_id = parse_record_id(body.campaign_id.as_deref());

    let outgoing = OutgoingEmail {
        from: body.from,
        cc: body.cc,
        bcc: body.bcc,
        reply_to: body.reply_to,
        attachments: body.attachments,
        campaign_id: body.campaign_id,
        ..OutgoingEmail::new(to, body.subject, body.html)
    };

    match email_client.send_email(&outgoing).await {
        Ok(receipt) => {
            record_delivery(
                &pool,
                NewEmailLog::sent(subscriber_id, campaign_id, receipt.id.clone()),
            )
            .await;
            tracing::info!(message_id = %receipt.id, "Email sent successfully");
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "data": SentData { id: receipt.id },
            })))
        }
        Err(e) => {
            // Every failed attempt is logged, whatever the cause.
            record_delivery(
                &pool,
                NewEmailLog::failed(subscriber_id, campaign_id, e.as_json()),
            )
            .await;
            match e {
                EmailClientError::Rejected { status, body } => Err(SendEmailError::Rejected {
                    status: StatusCode::from_u16(status.as_u16())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    error: body,
                }),
                e @ EmailClientError::Transport(_) => Err(SendEmailError::UnexpectedError(e)),
            }
        }
    }
}
