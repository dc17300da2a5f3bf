//! src/email_client.rs

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};

/// A single address or a list of addresses, passed through to the provider as
/// given.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn is_empty(&self) -> bool {
        match self {
            Recipients::One(address) => address.trim().is_empty(),
            Recipients::Many(addresses) => addresses.iter().all(|a| a.trim().is_empty()),
        }
    }

    /// The first address, used to look up the subscriber a send belongs to.
    pub fn primary(&self) -> Option<&str> {
        match self {
            Recipients::One(address) => Some(address.as_str()),
            Recipients::Many(addresses) => addresses.first().map(String::as_str),
        }
    }
}

impl From<&str> for Recipients {
    fn from(address: &str) -> Self {
        Recipients::One(address.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Recipients,
    pub subject: String,
    pub html: String,
    pub from: Option<String>,
    pub cc: Option<Recipients>,
    pub bcc: Option<Recipients>,
    pub reply_to: Option<String>,
    pub attachments: Option<Vec<serde_json::Value>>,
    pub campaign_id: Option<String>,
}

impl OutgoingEmail {
    pub fn new(to: Recipients, subject: String, html: String) -> Self {
        Self {
            to,
            subject,
            html,
            from: None,
            cc: None,
            bcc: None,
            reply_to: None,
            attachments: None,
            campaign_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct ProviderReceipt {
    pub id: String,
}

#[derive(thiserror::Error, Debug)]
pub enum EmailClientError {
    #[error("The email provider rejected the message with status {status}")]
    Rejected {
        status: StatusCode,
        body: serde_json::Value,
    },
    #[error("Failed to reach the email provider")]
    Transport(#[from] reqwest::Error),
}

impl EmailClientError {
    /// The JSON stored in the email log and returned to API callers.
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            Self::Rejected { body, .. } => body.clone(),
            Self::Transport(e) => serde_json::Value::String(e.to_string()),
        }
    }
}

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    default_sender: String,
    api_key: Secret<String>,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        default_sender: String,
        api_key: Secret<String>,
        timeout: std::time::Duration,
    ) -> Self {
        let http_client = Client::builder().timeout(timeout).build().unwrap();
        Self {
            http_client,
            base_url,
            default_sender,
            api_key,
        }
    }

    pub fn default_sender(&self) -> &str {
        &self.default_sender
    }

    #[tracing::instrument(
        name = "Sending email through the provider",
        skip(self, email),
        fields(subject = %email.subject)
    )]
    pub async fn send_email(&self, email: &OutgoingEmail) -> Result<ProviderReceipt, EmailClientError> {
        let url = format!("{}/emails", self.base_url);
        let mut tags = vec![Tag {
            name: "source",
            value: "nextmailer-api",
        }];
        if let Some(campaign_id) = email.campaign_id.as_deref() {
            tags.push(Tag {
                name: "campaign_id",
                value: campaign_id,
            });
        }
        let text = format!(
            "{} - View this email in your browser for better formatting.",
            email.subject
        );
        let request_body = SendEmailRequest {
            from: email.from.as_deref().unwrap_or(&self.default_sender),
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            text: &text,
            cc: email.cc.as_ref(),
            bcc: email.bcc.as_ref(),
            reply_to: email.reply_to.as_deref(),
            attachments: email.attachments.as_deref(),
            tags,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .json::<serde_json::Value>()
                .await
                .unwrap_or(serde_json::Value::Null);
            tracing::error!(%status, error = %body, "The email provider rejected the message");
            return Err(EmailClientError::Rejected { status, body });
        }

        let receipt = response.json::<ProviderReceipt>().await?;
        Ok(receipt)
    }
}

#[derive(serde::Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a Recipients,
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cc: Option<&'a Recipients>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bcc: Option<&'a Recipients>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<&'a [serde_json::Value]>,
    tags: Vec<Tag<'a>>,
}

#[derive(serde::Serialize)]
struct Tag<'a> {
    name: &'a str,
    value: &'a str,
}
