//! Reaction — a derived-value rule recomputing one field when its
//! dependencies change, plus the host contract the graph drives it through.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::classify::ErrorRecord;
use crate::error::RuleFailure;

/// Closure type for reaction compute functions. Receives the current values
/// of the reaction's dependencies and returns the new value for the owning
/// field.
pub type ComputeFn = dyn Fn(&Map<String, Value>) -> Result<Value, RuleFailure> + Send + Sync;

/// Closure type for reaction side-effect callbacks. Receives the dependency
/// values plus the computed result under the `"computed"` key.
pub type ActionFn = dyn Fn(&Map<String, Value>) + Send + Sync;

/// A derived-value rule attached to an owner field.
#[derive(Clone)]
pub struct Reaction {
    deps: Vec<String>,
    compute: Arc<ComputeFn>,
    action: Option<Arc<ActionFn>>,
}

impl Reaction {
    /// Create a reaction over `deps` with the given compute function.
    pub fn new<F>(deps: &[&str], compute: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, RuleFailure> + Send + Sync + 'static,
    {
        Self {
            deps: deps.iter().map(|d| d.to_string()).collect(),
            compute: Arc::new(compute),
            action: None,
        }
    }

    /// Attach a side-effect callback, invoked after a successful compute and
    /// commit with the dependency values plus the `"computed"` result.
    pub fn with_action(mut self, action: impl Fn(&Map<String, Value>) + Send + Sync + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// The dependency field names, in declaration order.
    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    pub(crate) fn compute(&self) -> &Arc<ComputeFn> {
        &self.compute
    }

    pub(crate) fn action(&self) -> Option<&Arc<ActionFn>> {
        self.action.as_ref()
    }
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("deps", &self.deps)
            .field("compute", &"<fn>")
            .field("action", &self.action.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// The coordinator-side contract the reaction graph executes against.
///
/// The graph owns scheduling only; reading dependency values, committing
/// computed results, and recording errors all go through the host.
#[async_trait]
pub trait ReactionHost: Send + Sync {
    /// The last-committed value of `field`, or `None` when it has none.
    fn value_of(&self, field: &str) -> Option<Value>;

    /// Commit a computed value to `field`, carrying the propagation stack so
    /// further fan-out can refuse cycles. Returns the commit's validation
    /// verdict.
    async fn commit_computed(&self, field: &str, value: Value, stack: Vec<String>) -> bool;

    /// Record a reaction-path error (classification plus accumulation).
    fn report(&self, record: ErrorRecord);
}
