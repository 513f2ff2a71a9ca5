//! Validation rules: the `Rule` type and the built-in rule library.

mod builtin;
mod rule;

pub use builtin::{email, iso_date, min, number, required};
pub use rule::{
    AsyncPredicateFn, ConditionFn, PredicateFuture, Rule, RulePredicate, SyncPredicateFn,
};
