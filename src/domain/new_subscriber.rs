//! src/domain/new_subscriber.rs

use crate::domain::{SubscriberEmail, SubscriberName};

pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub first_name: Option<SubscriberName>,
    pub last_name: Option<SubscriberName>,
    pub source: SubscriberSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberSource {
    Website,
    LeadMagnet,
}

impl SubscriberSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberSource::Website => "website",
            SubscriberSource::LeadMagnet => "lead_magnet",
        }
    }
}
