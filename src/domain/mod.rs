//! src/domain/mod.rs

mod email_status;
mod new_subscriber;
mod subscriber_email;
mod subscriber_name;
mod subscriber_status;

pub use email_status::{EmailMetadata, EmailStatus};
pub use new_subscriber::{NewSubscriber, SubscriberSource};
pub use subscriber_email::SubscriberEmail;
pub use subscriber_name::SubscriberName;
pub use subscriber_status::SubscriberStatus;
