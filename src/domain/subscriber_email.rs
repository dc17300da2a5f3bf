//! src/domain/subscriber_email.rs

use validator::ValidateEmail;

#[derive(Debug, Clone)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(s: String) -> Result<SubscriberEmail, String> {
        let candidate = s.trim().to_string();
        if candidate.is_empty() {
            return Err("Email is required".to_string());
        }
        if candidate.validate_email() {
            Ok(Self(candidate))
        } else {
            Err("Invalid email address".to_string())
        }
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
