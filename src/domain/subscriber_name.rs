//! src/domain/subscriber_name.rs

use unicode_segmentation::UnicodeSegmentation;

const MAX_GRAPHEMES: usize = 100;
const FORBIDDEN_CHARACTERS: [char; 9] = ['/', '(', ')', '"', '<', '>', '\\', '{', '}'];

/// A first or last name. Both are optional on every form, so blank input
/// parses to `None` rather than an error.
#[derive(Debug, Clone)]
pub struct SubscriberName(String);

impl SubscriberName {
    pub fn parse(s: String) -> Result<Option<SubscriberName>, String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.graphemes(true).count() > MAX_GRAPHEMES {
            return Err(format!("{} is too long to be a valid name.", trimmed));
        }
        if trimmed.chars().any(|c| FORBIDDEN_CHARACTERS.contains(&c)) {
            return Err(format!("{} is not a valid name.", trimmed));
        }
        Ok(Some(Self(trimmed.to_string())))
    }

    pub fn parse_optional(s: Option<String>) -> Result<Option<SubscriberName>, String> {
        match s {
            Some(s) => Self::parse(s),
            None => Ok(None),
        }
    }
}

impl AsRef<str> for SubscriberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
