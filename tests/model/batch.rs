//! Tests for `FormModel::set_fields`: concurrent per-field validation,
//! deferred fan-out, batch de-duplication, conjunction verdict.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use formwork::model::FormModel;
use formwork::reaction::Reaction;
use formwork::rules::{min, number};
use formwork::schema::{FieldSchema, ModelSchema};

fn map_of(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Verdicts
// ============================================================================

#[tokio::test]
async fn all_valid_returns_true_and_commits_everything() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().rule(number()))
        .field("b", FieldSchema::number().rule(number()))
        .build();
    let model = FormModel::with_defaults(schema);

    let ok = model
        .set_fields(map_of(&[("a", json!(1)), ("b", json!(2))]))
        .await;

    assert!(ok);
    assert_eq!(model.get_field("a"), Some(json!(1)));
    assert_eq!(model.get_field("b"), Some(json!(2)));
}

#[tokio::test]
async fn one_invalid_entry_fails_the_batch_but_not_the_others() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().rule(number()))
        .field("b", FieldSchema::number().rules([number(), min(10.0)]))
        .build();
    let model = FormModel::with_defaults(schema);

    let ok = model
        .set_fields(map_of(&[("a", json!(1)), ("b", json!(3))]))
        .await;

    assert!(!ok, "conjunction of verdicts");
    assert_eq!(model.get_field("a"), Some(json!(1)), "valid entry still commits");
    assert_eq!(model.get_field("b"), None);
    assert_eq!(model.dirty_data().get("b"), Some(&json!(3)));
}

#[tokio::test]
async fn unknown_field_in_batch_fails_the_conjunction() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number())
        .build();
    let model = FormModel::with_defaults(schema);

    let ok = model
        .set_fields(map_of(&[("a", json!(1)), ("ghost", json!(2))]))
        .await;

    assert!(!ok);
    assert_eq!(model.get_field("a"), Some(json!(1)));
}

// ============================================================================
// Reaction de-duplication
// ============================================================================

#[tokio::test]
async fn reaction_over_two_batch_fields_fires_once() {
    let computes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&computes);

    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().default_value(json!(0)))
        .field("b", FieldSchema::number().default_value(json!(0)))
        .field(
            "c",
            FieldSchema::number().react(Reaction::new(&["a", "b"], move |deps| {
                counter.fetch_add(1, Ordering::SeqCst);
                let a = deps["a"].as_f64().unwrap_or(0.0);
                let b = deps["b"].as_f64().unwrap_or(0.0);
                Ok(json!(a + b))
            })),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    model
        .set_fields(map_of(&[("a", json!(1)), ("b", json!(2))]))
        .await;
    model.settled().await;

    assert_eq!(model.get_field("c"), Some(json!(3.0)));
    assert_eq!(computes.load(Ordering::SeqCst), 1, "one run for the whole batch");
}

#[tokio::test]
async fn reactions_do_not_fire_until_the_whole_batch_committed() {
    // The reaction reads both fields; with fan-out deferred to the end of
    // the batch it must observe both new values, never a half-applied mix.
    let seen = Arc::new(parking_lot::Mutex::new(Vec::<(f64, f64)>::new()));
    let seen_clone = Arc::clone(&seen);

    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().default_value(json!(0)))
        .field("b", FieldSchema::number().default_value(json!(0)))
        .field(
            "sum",
            FieldSchema::number().react(Reaction::new(&["a", "b"], move |deps| {
                let a = deps["a"].as_f64().unwrap_or(0.0);
                let b = deps["b"].as_f64().unwrap_or(0.0);
                seen_clone.lock().push((a, b));
                Ok(json!(a + b))
            })),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    model
        .set_fields(map_of(&[("a", json!(5)), ("b", json!(7))]))
        .await;
    model.settled().await;

    assert_eq!(*seen.lock(), vec![(5.0, 7.0)]);
}

#[tokio::test]
async fn distinct_reactions_each_fire_for_their_dependency() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().default_value(json!(0)))
        .field("b", FieldSchema::number().default_value(json!(0)))
        .field(
            "double_a",
            FieldSchema::number().react(Reaction::new(&["a"], |deps| {
                Ok(json!(deps["a"].as_f64().unwrap_or(0.0) * 2.0))
            })),
        )
        .field(
            "double_b",
            FieldSchema::number().react(Reaction::new(&["b"], |deps| {
                Ok(json!(deps["b"].as_f64().unwrap_or(0.0) * 2.0))
            })),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    model
        .set_fields(map_of(&[("a", json!(3)), ("b", json!(4))]))
        .await;
    model.settled().await;

    assert_eq!(model.get_field("double_a"), Some(json!(6.0)));
    assert_eq!(model.get_field("double_b"), Some(json!(8.0)));
}
