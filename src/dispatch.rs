//! src/dispatch.rs
//!
//! Server-side email dispatch: resolve the subscriber, render the template,
//! deliver through the configured transport.

use crate::authentication::{sign_request, TIMESTAMP_HEADER, TOKEN_HEADER};
use crate::email_client::{EmailClient, EmailClientError, OutgoingEmail, Recipients};
use crate::email_log::{record_delivery, NewEmailLog};
use crate::templates::{LayoutProps, LeadMagnetProps, RenderError, TemplateProps, TemplateRenderer};
use crate::utils::error_chain_fmt;
use anyhow::Context;
use reqwest::Client;
use secrecy::Secret;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Call the provider in-process and log the attempt here.
    Direct,
    /// Post the rendered HTML to this service's own `/api/send`, which
    /// delivers and logs.
    Relay,
}

/// Addressing shared by every kind of email.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub to: String,
    pub from: Option<String>,
    pub cc: Option<Recipients>,
    pub bcc: Option<Recipients>,
    pub reply_to: Option<String>,
    pub subscriber_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
}

impl Envelope {
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct StandardEmail {
    pub envelope: Envelope,
    pub subject: String,
    pub layout: LayoutProps,
}

#[derive(Debug, Clone)]
pub struct LeadMagnetEmail {
    pub envelope: Envelope,
    pub props: LeadMagnetProps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    pub id: String,
}

#[derive(thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("The email provider rejected the message with status {status}")]
    Rejected { status: u16, error: serde_json::Value },
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

pub enum Transport {
    Direct(Arc<EmailClient>),
    Relay(RelayClient),
}

pub struct EmailDispatcher {
    pool: PgPool,
    renderer: TemplateRenderer,
    transport: Transport,
}

impl EmailDispatcher {
    pub fn new(pool: PgPool, renderer: TemplateRenderer, transport: Transport) -> Self {
        Self {
            pool,
            renderer,
            transport,
        }
    }

    #[tracing::instrument(
        name = "Sending a standard email",
        skip(self, email),
        fields(subject = %email.subject)
    )]
    pub async fn send_standard_email(
        &self,
        email: StandardEmail,
    ) -> Result<DispatchReceipt, DispatchError> {
        let props = TemplateProps::Layout(email.layout);
        self.send(email.envelope, email.subject, props).await
    }

    #[tracing::instrument(
        name = "Sending a lead magnet email",
        skip(self, email),
        fields(title = %email.props.title)
    )]
    pub async fn send_lead_magnet_email(
        &self,
        email: LeadMagnetEmail,
    ) -> Result<DispatchReceipt, DispatchError> {
        let subject = format!("Your download: {}", email.props.title);
        let props = TemplateProps::LeadMagnet(email.props);
        self.send(email.envelope, subject, props).await
    }

    async fn send(
        &self,
        mut envelope: Envelope,
        subject: String,
        props: TemplateProps,
    ) -> Result<DispatchReceipt, DispatchError> {
        if envelope.subscriber_id.is_none() {
            envelope.subscriber_id = self.subscriber_id_for(&envelope.to).await;
        }
        // A render failure aborts before anything is sent or logged.
        let html = self.renderer.render(&props).await?;

        let outgoing = OutgoingEmail {
            to: Recipients::One(envelope.to.clone()),
            subject,
            html,
            from: envelope.from.clone(),
            cc: envelope.cc.clone(),
            bcc: envelope.bcc.clone(),
            reply_to: envelope.reply_to.clone(),
            attachments: None,
            campaign_id: envelope.campaign_id.map(|id| id.to_string()),
        };

        match &self.transport {
            Transport::Direct(email_client) => {
                self.deliver_direct(email_client, &outgoing, &envelope).await
            }
            // The send endpoint writes the log row for relayed messages.
            Transport::Relay(relay) => relay.send(&outgoing, &envelope).await,
        }
    }

    async fn deliver_direct(
        &self,
        email_client: &EmailClient,
        outgoing: &OutgoingEmail,
        envelope: &Envelope,
    ) -> Result<DispatchReceipt, DispatchError> {
        match email_client.send_email(outgoing).await {
            Ok(receipt) => {
                let entry = NewEmailLog::sent(
                    envelope.subscriber_id,
                    envelope.campaign_id,
                    receipt.id.clone(),
                );
                record_delivery(&self.pool, entry).await;
                tracing::info!(message_id = %receipt.id, "Email sent successfully");
                Ok(DispatchReceipt { id: receipt.id })
            }
            Err(e) => {
                let entry =
                    NewEmailLog::failed(envelope.subscriber_id, envelope.campaign_id, e.as_json());
                record_delivery(&self.pool, entry).await;
                match e {
                    EmailClientError::Rejected { status, body } => Err(DispatchError::Rejected {
                        status: status.as_u16(),
                        error: body,
                    }),
                    EmailClientError::Transport(e) => {
                        Err(anyhow::Error::new(e).context("Failed to send email").into())
                    }
                }
            }
        }
    }

    /// A failed lookup is logged and treated as an unknown subscriber.
    async fn subscriber_id_for(&self, email: &str) -> Option<Uuid> {
        match get_subscriber_id_by_email(&self.pool, email).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error.cause_chain = ?e, "Error finding subscriber");
                None
            }
        }
    }
}

#[tracing::instrument(name = "Looking up subscriber id by email", skip(pool, email))]
pub async fn get_subscriber_id_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let id = sqlx::query_scalar::<_, Uuid>(r#"SELECT id FROM subscribers WHERE email = $1 LIMIT 1"#)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Client for this service's own `/api/send` endpoint, authenticated with an
/// internal token.
pub struct RelayClient {
    http_client: Client,
    endpoint: String,
    api_key: Secret<String>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    to: &'a Recipients,
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cc: Option<&'a Recipients>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<&'a Recipients>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscriber_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    campaign_id: Option<Uuid>,
}

#[derive(serde::Deserialize)]
struct RelayResponse {
    #[serde(default)]
    data: Option<RelayReceipt>,
    #[serde(default)]
    error: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct RelayReceipt {
    id: String,
}

impl RelayClient {
    pub fn new(base_url: &str, api_key: Secret<String>, timeout: std::time::Duration) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            endpoint: format!("{}/api/send", base_url.trim_end_matches('/')),
            api_key,
        }
    }

    #[tracing::instrument(name = "Relaying email to the send endpoint", skip_all)]
    async fn send(
        &self,
        outgoing: &OutgoingEmail,
        envelope: &Envelope,
    ) -> Result<DispatchReceipt, DispatchError> {
        let (timestamp, token) = sign_request(&self.api_key);
        let body = RelayRequest {
            to: &outgoing.to,
            subject: &outgoing.subject,
            html: &outgoing.html,
            from: outgoing.from.as_deref(),
            cc: outgoing.cc.as_ref(),
            bcc: outgoing.bcc.as_ref(),
            reply_to: outgoing.reply_to.as_deref(),
            subscriber_id: envelope.subscriber_id,
            campaign_id: envelope.campaign_id,
        };
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(TIMESTAMP_HEADER, timestamp)
            .header(TOKEN_HEADER, token)
            .json(&body)
            .send()
            .await
            .context("Failed to reach the send endpoint")?;

        let status = response.status();
        let reply = response.json::<RelayResponse>().await.ok();
        if !status.is_success() {
            tracing::error!(%status, "The send endpoint returned an error status");
            let error = match reply {
                Some(r) if !r.error.is_null() => r.error,
                _ => serde_json::Value::String(format!("API error: {}", status.as_u16())),
            };
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                error,
            });
        }
        reply
            .and_then(|r| r.data)
            .map(|data| DispatchReceipt { id: data.id })
            .ok_or_else(|| anyhow::anyhow!("The send endpoint returned no message id").into())
    }
}
