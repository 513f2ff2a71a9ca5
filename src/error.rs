use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// RuleFailure
// ---------------------------------------------------------------------------

/// Error type produced by user-supplied closures (async rule predicates,
/// reaction compute functions). Boxed so user code can bubble up anything
/// that implements `std::error::Error`.
pub type RuleFailure = Box<dyn std::error::Error + Send + Sync>;

// ---------------------------------------------------------------------------
// FieldError
// ---------------------------------------------------------------------------

/// A single per-field validation failure, as stored in the model's error map.
///
/// `rule` is the tag of the rule that rejected the value, or
/// `"validation_error"` for timeouts and predicate failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Synthetic error-map key under which reaction failures accumulate.
pub const REACTION_ERRORS_KEY: &str = "__reactions";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
