//! src/routes/lead_magnet.rs

use crate::configurations::LeadMagnetSettings;
use crate::dispatch::{EmailDispatcher, Envelope, LeadMagnetEmail};
use crate::domain::SubscriberSource;
use crate::routes::{register_subscriber, FormData, SubscribeError, SubscribeResponse};
use crate::templates::{LeadMagnetProps, DEFAULT_BUTTON_TEXT};
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadMagnetKind {
    Ebook,
    Pdf,
    Video,
    Image,
    Audio,
    Checklist,
    Template,
    #[default]
    Other,
}

impl LeadMagnetKind {
    pub fn button_text(&self) -> &'static str {
        match self {
            LeadMagnetKind::Ebook => "Download Your eBook",
            _ => DEFAULT_BUTTON_TEXT,
        }
    }
}

impl LeadMagnetSettings {
    pub fn email_props(&self, recipient_name: Option<String>) -> LeadMagnetProps {
        LeadMagnetProps {
            recipient_name,
            title: self.content_title.clone(),
            description: None,
            download_url: self.download_url.clone(),
            cover_image_url: self.cover_image_url.clone(),
            button_text: Some(self.kind.button_text().to_string()),
            dark_mode: None,
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadMagnetResponse {
    #[serde(flatten)]
    subscription: SubscribeResponse,
    email_sent: bool,
}

/// Subscribe, then send the download whether or not the subscriber is new.
#[tracing::instrument(
    name = "Claiming the lead magnet",
    skip(form, pool, dispatcher, lead_magnet),
    fields(subscriber_email = %form.email)
)]
pub async fn claim_lead_magnet(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
    dispatcher: web::Data<EmailDispatcher>,
    lead_magnet: web::Data<LeadMagnetSettings>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscriber = form
        .0
        .into_new_subscriber(SubscriberSource::LeadMagnet)
        .map_err(SubscribeError::ValidationError)?;
    let outcome = register_subscriber(&pool, &new_subscriber).await?;

    let recipient_name = new_subscriber
        .first_name
        .as_ref()
        .map(|name| name.as_ref().to_string());
    let email = LeadMagnetEmail {
        envelope: Envelope {
            subscriber_id: Some(outcome.record().id),
            ..Envelope::to(new_subscriber.email.as_ref())
        },
        props: lead_magnet.email_props(recipient_name),
    };
    // Existing subscribers get the download too.
    let email_sent = match dispatcher.send_lead_magnet_email(email).await {
        Ok(receipt) => {
            tracing::info!(message_id = %receipt.id, "Lead magnet email sent");
            true
        }
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "Failed to send lead magnet email");
            false
        }
    };

    Ok(HttpResponse::Ok().json(LeadMagnetResponse {
        subscription: SubscribeResponse::from(outcome),
        email_sent,
    }))
}
