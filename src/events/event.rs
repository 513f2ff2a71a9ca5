//! ModelEvent — payloads emitted on the model's event bus.

use serde_json::Value;

use crate::classify::ErrorRecord;

/// Event name: a field's committed value changed.
pub const FIELD_CHANGE: &str = "field:change";
/// Event name: a set targeted a field that is not declared in the schema.
pub const FIELD_NOT_FOUND: &str = "field:not-found";
/// Event name: a validator rejected a candidate value.
pub const VALIDATION_ERROR: &str = "validation:error";
/// Event name: a full-model validation pass finished.
pub const VALIDATION_COMPLETE: &str = "validation:complete";
/// Event name: a reaction failed or a dependency cycle was refused.
pub const REACTION_ERROR: &str = "reaction:error";

/// An event emitted by the model coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A field's committed value changed.
    FieldChange { field: String, value: Value },
    /// A set targeted an undeclared field.
    FieldNotFound(ErrorRecord),
    /// A validator rejected a candidate value.
    ValidationError(ErrorRecord),
    /// A `validate_all` pass finished.
    ValidationComplete { is_valid: bool },
    /// A reaction failed, a dependency was missing, or a cycle was refused.
    ReactionError(ErrorRecord),
}

impl ModelEvent {
    /// The bus channel this event is emitted on.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FieldChange { .. } => FIELD_CHANGE,
            Self::FieldNotFound(_) => FIELD_NOT_FOUND,
            Self::ValidationError(_) => VALIDATION_ERROR,
            Self::ValidationComplete { .. } => VALIDATION_COMPLETE,
            Self::ReactionError(_) => REACTION_ERROR,
        }
    }

    /// The field this event concerns, when it has one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::FieldChange { field, .. } => Some(field),
            Self::FieldNotFound(r) | Self::ValidationError(r) | Self::ReactionError(r) => {
                r.field.as_deref()
            }
            Self::ValidationComplete { .. } => None,
        }
    }
}
