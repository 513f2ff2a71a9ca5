//! Validation pipeline — runs a field's ordered rule list against a
//! candidate value.
//!
//! Sync predicates are judged inline. Async predicates race a per-validator
//! timeout; the timer is dropped on every exit path. Two modes:
//!
//!   - fail-fast: rules run sequentially, the first failure stops the run;
//!   - aggregate (default): rules run concurrently, every failure is
//!     recorded, and the verdict is the conjunction. The recorded order of
//!     failures within the field's error list is not guaranteed.
//!
//! Every failure also dispatches a `Validation` record through the
//! classifier so subscribers (and, via the coordinator's forwarders, the
//! event bus) observe it.

use std::time::Duration;

use futures::future::join_all;
use serde_json::{Map, Value};

use crate::classify::{ErrorClassifier, ErrorRecord};
use crate::error::FieldError;
use crate::rules::{Rule, RulePredicate};

/// Rule tag recorded for timeouts and failed (not merely falsy) predicates.
pub const VALIDATION_ERROR_RULE: &str = "validation_error";

/// How a single rule judged the candidate.
enum RuleOutcome {
    Valid,
    /// Predicate returned false.
    Invalid,
    /// Timeout or predicate failure; carries the cause text.
    Failed(String),
}

async fn eval_rule(field: &str, rule: &Rule, value: &Value, timeout: Duration) -> RuleOutcome {
    let Some(predicate) = rule.predicate() else {
        return RuleOutcome::Valid;
    };
    match predicate {
        RulePredicate::Sync(p) => {
            if p(value) {
                RuleOutcome::Valid
            } else {
                RuleOutcome::Invalid
            }
        }
        RulePredicate::Async(p) => match tokio::time::timeout(timeout, p(value.clone())).await {
            Err(_elapsed) => RuleOutcome::Failed(format!("Validation timeout: {field}")),
            Ok(Err(e)) => RuleOutcome::Failed(e.to_string()),
            Ok(Ok(true)) => RuleOutcome::Valid,
            Ok(Ok(false)) => RuleOutcome::Invalid,
        },
    }
}

/// Judge one rule and, on failure, build the error record and notify the
/// classifier. Returns `None` when the value passed.
async fn judge(
    field: &str,
    rule: &Rule,
    value: &Value,
    timeout: Duration,
    classifier: &ErrorClassifier,
) -> Option<FieldError> {
    match eval_rule(field, rule, value, timeout).await {
        RuleOutcome::Valid => None,
        RuleOutcome::Invalid => {
            classifier.trigger(&ErrorRecord::validation(field, rule.message()));
            Some(FieldError::new(field, rule.tag(), rule.message()))
        }
        RuleOutcome::Failed(cause) => {
            let message = format!("Validation failed: {cause}");
            classifier.trigger(&ErrorRecord::validation(field, message.clone()));
            Some(FieldError::new(field, VALIDATION_ERROR_RULE, message))
        }
    }
}

/// Run `rules` against `value` for `field`, appending failures to `out`.
///
/// `data` is the committed-data snapshot used to evaluate rule conditions.
/// Returns true when every applicable rule judged the value valid.
#[allow(clippy::too_many_arguments)]
pub async fn validate_field(
    field: &str,
    rules: &[Rule],
    value: &Value,
    data: &Map<String, Value>,
    timeout: Duration,
    classifier: &ErrorClassifier,
    fail_fast: bool,
    out: &mut Vec<FieldError>,
) -> bool {
    if rules.is_empty() {
        return true;
    }

    let applicable: Vec<&Rule> = rules.iter().filter(|r| r.applies_to(data)).collect();

    if fail_fast {
        for rule in applicable {
            if let Some(err) = judge(field, rule, value, timeout, classifier).await {
                out.push(err);
                return false;
            }
        }
        return true;
    }

    let outcomes = join_all(
        applicable
            .into_iter()
            .map(|rule| judge(field, rule, value, timeout, classifier)),
    )
    .await;

    let mut valid = true;
    for err in outcomes.into_iter().flatten() {
        out.push(err);
        valid = false;
    }
    valid
}
