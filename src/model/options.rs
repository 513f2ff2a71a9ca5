//! Model construction options.

use std::sync::Arc;

use crate::classify::ErrorClassifier;
use crate::error::FieldError;

/// Closure type for custom error formatting in validation summaries.
pub type ErrorFormatterFn = dyn Fn(&FieldError) -> String + Send + Sync;

/// Configuration for [`FormModel`](super::FormModel).
///
/// All fields default to the engine's standard behavior; construct with
/// struct-update syntax: `ModelOptions { fail_fast: true, ..Default::default() }`.
pub struct ModelOptions {
    /// Deadline for each async validator, in milliseconds (default: 5000).
    pub async_validation_timeout_ms: u64,
    /// Debounce window for reactions, in milliseconds. 0 (the default) runs
    /// reactions inline on the committing call path.
    pub debounce_reactions_ms: u64,
    /// Custom formatter for [`FormModel::validation_summary`](super::FormModel::validation_summary)
    /// entries (default: `"<field>: <message>"`).
    pub error_formatter: Option<Arc<ErrorFormatterFn>>,
    /// Stop a field's validation at its first failing rule. When false (the
    /// default) all rules run and every failure is recorded.
    pub fail_fast: bool,
    /// Reserved. Sets targeting undeclared fields are classified
    /// `FieldNotFound` regardless of this flag.
    pub strict_mode: bool,
    /// Inject an external classifier instead of an owned one. An injected
    /// classifier's subscribers are left intact on dispose.
    pub error_handler: Option<Arc<ErrorClassifier>>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            async_validation_timeout_ms: 5000,
            debounce_reactions_ms: 0,
            error_formatter: None,
            fail_fast: false,
            strict_mode: false,
            error_handler: None,
        }
    }
}

impl std::fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelOptions")
            .field("async_validation_timeout_ms", &self.async_validation_timeout_ms)
            .field("debounce_reactions_ms", &self.debounce_reactions_ms)
            .field("error_formatter", &self.error_formatter.as_ref().map(|_| "<fn>"))
            .field("fail_fast", &self.fail_fast)
            .field("strict_mode", &self.strict_mode)
            .field("error_handler", &self.error_handler.as_ref().map(|_| "<classifier>"))
            .finish()
    }
}
