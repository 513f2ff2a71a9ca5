//! Rule — a tagged validator with a human message and a sync or async
//! predicate.
//!
//! Predicates are first-class closures. A sync predicate judges the value
//! directly; an async predicate returns a future whose `Err` corresponds to
//! a failed (not merely falsy) check. An optional condition over the whole
//! data snapshot gates whether the rule runs at all.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::RuleFailure;

/// Closure type for synchronous predicates.
pub type SyncPredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// Boxed future returned by async predicates.
pub type PredicateFuture = Pin<Box<dyn Future<Output = Result<bool, RuleFailure>> + Send>>;

/// Closure type for asynchronous predicates.
pub type AsyncPredicateFn = dyn Fn(Value) -> PredicateFuture + Send + Sync;

/// Closure type for rule conditions, evaluated over the committed data
/// snapshot.
pub type ConditionFn = dyn Fn(&Map<String, Value>) -> bool + Send + Sync;

/// A rule's predicate: sync, async, or absent (always valid).
#[derive(Clone)]
pub enum RulePredicate {
    Sync(Arc<SyncPredicateFn>),
    Async(Arc<AsyncPredicateFn>),
}

/// A tagged validator.
#[derive(Clone)]
pub struct Rule {
    tag: String,
    message: String,
    predicate: Option<RulePredicate>,
    condition: Option<Arc<ConditionFn>>,
}

impl Rule {
    /// Create a rule with a synchronous predicate.
    pub fn new(
        tag: impl Into<String>,
        message: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
            predicate: Some(RulePredicate::Sync(Arc::new(predicate))),
            condition: None,
        }
    }

    /// Create a rule with an asynchronous predicate.
    ///
    /// The future resolves to `Ok(true)` for valid, `Ok(false)` for invalid,
    /// or `Err` for a failed check (reported with the `validation_error`
    /// rule tag).
    pub fn new_async<F, Fut>(tag: impl Into<String>, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, RuleFailure>> + Send + 'static,
    {
        let boxed: Arc<AsyncPredicateFn> =
            Arc::new(move |value| Box::pin(predicate(value)) as PredicateFuture);
        Self {
            tag: tag.into(),
            message: message.into(),
            predicate: Some(RulePredicate::Async(boxed)),
            condition: None,
        }
    }

    /// Create a predicate-less rule. It always judges the value valid; the
    /// tag and message serve as schema documentation only.
    pub fn tag_only(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
            predicate: None,
            condition: None,
        }
    }

    /// Derive a new rule sharing this rule's predicate but carrying
    /// `message` instead.
    pub fn with_message(&self, message: impl Into<String>) -> Self {
        Self {
            tag: self.tag.clone(),
            message: message.into(),
            predicate: self.predicate.clone(),
            condition: self.condition.clone(),
        }
    }

    /// Gate this rule on `condition`, evaluated over the committed data
    /// snapshot. When the condition returns false the rule is skipped and
    /// the value passes.
    pub fn when(
        mut self,
        condition: impl Fn(&Map<String, Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.condition = Some(Arc::new(condition));
        self
    }

    /// The rule's identity tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The predicate, if one is present.
    pub(crate) fn predicate(&self) -> Option<&RulePredicate> {
        self.predicate.as_ref()
    }

    /// Whether this rule should run for the given data snapshot.
    pub(crate) fn applies_to(&self, data: &Map<String, Value>) -> bool {
        match &self.condition {
            Some(cond) => cond(data),
            None => true,
        }
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("tag", &self.tag)
            .field("message", &self.message)
            .field(
                "predicate",
                &self.predicate.as_ref().map(|p| match p {
                    RulePredicate::Sync(_) => "<sync>",
                    RulePredicate::Async(_) => "<async>",
                }),
            )
            .field("condition", &self.condition.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
