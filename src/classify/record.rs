//! Typed error records — the error taxonomy produced by the engine.
//!
//! Errors are data, not control flow: every failure mode has a kind, an
//! optional field scope, a message, and an optionally captured underlying
//! error. The coordinator never rethrows; records flow to classifier
//! subscribers and, via forwarders, onto the event bus.

use serde::Serialize;
use thiserror::Error;

/// Exhaustive classification of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A validator rejected a candidate value (or timed out / failed).
    Validation,
    /// A reaction's compute, commit, or action failed.
    Reaction,
    /// A set targeted a field not declared in the schema.
    FieldNotFound,
    /// A reaction dependency had no committed value at compute time.
    DependencyError,
    /// A reaction was refused because its owner was already on the
    /// propagation stack.
    CircularDependency,
    /// Catch-all; subscribers to this kind observe every record.
    Unknown,
}

impl ErrorKind {
    /// The stable snake_case name used in error-map entries and summaries.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Reaction => "reaction",
            Self::FieldNotFound => "field_not_found",
            Self::DependencyError => "dependency_error",
            Self::CircularDependency => "circular_dependency",
            Self::Unknown => "unknown",
        }
    }
}

/// A classified error record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    /// The field the error is scoped to; `None` only for [`ErrorKind::Unknown`].
    pub field: Option<String>,
    pub message: String,
    /// Stringified underlying error, when one was captured.
    pub original: Option<String>,
}

impl ErrorRecord {
    /// A validator rejected `field`'s candidate value.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            field: Some(field.into()),
            message: message.into(),
            original: None,
        }
    }

    /// A reaction owned by `field` failed with `source`.
    pub fn reaction(field: impl Into<String>, source: impl std::fmt::Display) -> Self {
        let source = source.to_string();
        Self {
            kind: ErrorKind::Reaction,
            field: Some(field.into()),
            message: format!("Reaction failed: {source}"),
            original: Some(source),
        }
    }

    /// A set targeted the undeclared field `field`.
    pub fn field_not_found(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            kind: ErrorKind::FieldNotFound,
            message: format!("Field not found: {field}"),
            field: Some(field),
            original: None,
        }
    }

    /// Reaction dependency `dep` of `owner` had no committed value.
    pub fn dependency_missing(owner: impl Into<String>, dep: &str) -> Self {
        let owner = owner.into();
        Self {
            kind: ErrorKind::DependencyError,
            message: format!("Dependency \"{dep}\" of \"{owner}\" has no value"),
            field: Some(owner),
            original: None,
        }
    }

    /// A reaction owned by `owner` was refused because `owner` already
    /// appears on the propagation path.
    pub fn circular(path: &[String], owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let mut segments = path.to_vec();
        segments.push(owner.clone());
        Self {
            kind: ErrorKind::CircularDependency,
            message: format!("Circular dependency detected: {}", segments.join(" -> ")),
            field: Some(owner),
            original: None,
        }
    }

    /// An unclassified error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            field: None,
            message: message.into(),
            original: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
