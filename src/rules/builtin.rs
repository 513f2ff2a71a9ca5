//! Built-in rules: `required`, `number`, `min`, `email`, `iso_date`.
//!
//! Each constructor returns a fresh [`Rule`] carrying the default English
//! message; use [`Rule::with_message`] to customize.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::rule::Rule;

/// Compiled once at first use.
fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"))
}

fn iso_date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,6})?Z?$")
            .expect("ISO date regex is valid")
    })
}

/// The value must be present: not null and, for strings, not empty.
pub fn required() -> Rule {
    Rule::new("required", "This field is required", |value| match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

/// The value must be a JSON number.
pub fn number() -> Rule {
    Rule::new("number", "Must be a number", |value| value.is_number())
}

/// The value must be a number greater than or equal to `n`.
pub fn min(n: f64) -> Rule {
    Rule::new("min", format!("Must be at least {n}"), move |value| {
        value.as_f64().map(|v| v >= n).unwrap_or(false)
    })
}

/// The value must be a string containing a plausible email address.
pub fn email() -> Rule {
    Rule::new("email", "Must be a valid email address", |value| {
        value
            .as_str()
            .map(|s| email_regex().is_match(s))
            .unwrap_or(false)
    })
}

/// The value must be an ISO 8601 date-time string.
///
/// Format is checked with a regex, then semantic correctness via chrono.
/// Strings without an explicit offset are normalised by appending `Z`.
pub fn iso_date() -> Rule {
    Rule::new("iso_date", "Must be an ISO 8601 date string", |value| {
        let Some(s) = value.as_str() else {
            return false;
        };
        if !iso_date_regex().is_match(s) {
            return false;
        }
        let has_offset = s.ends_with('Z') || s[10..].contains('+');
        let normalised = if has_offset {
            s.to_string()
        } else {
            format!("{s}Z")
        };
        chrono::DateTime::parse_from_rfc3339(&normalised).is_ok()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
