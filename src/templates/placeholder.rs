//! src/templates/placeholder.rs

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").unwrap());

/// Replace every `{{key}}` token in `html` with the matching value from
/// `props`.
///
/// Null and missing values remove the token. Strings are inserted verbatim,
/// anything else in its JSON form (`42`, `true`, `{"a":1}`). Dotted keys are
/// looked up as-is first, then as a path into nested objects.
pub fn substitute_placeholders(html: &str, props: &Map<String, Value>) -> String {
    PLACEHOLDER
        .replace_all(html, |caps: &Captures| {
            match lookup(props, &caps[1]) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}

fn lookup<'a>(props: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = props.get(key) {
        return Some(value);
    }
    let mut segments = key.split('.');
    let mut current = props.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
