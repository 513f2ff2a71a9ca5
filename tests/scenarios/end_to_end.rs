//! End-to-end scenarios: overlapping async validations, batched updates,
//! reaction chains, debounced collapse, cycles, timeouts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Map, Value};

use formwork::model::{FormModel, ModelOptions};
use formwork::reaction::Reaction;
use formwork::rules::Rule;
use formwork::schema::{FieldSchema, ModelSchema};

fn map_of(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// ============================================================================
// Overlapping async validations: last writer wins
// ============================================================================

#[tokio::test]
async fn slow_validation_loses_to_a_newer_set() {
    let schema = ModelSchema::builder()
        .field(
            "field",
            FieldSchema::string().rule(Rule::new_async(
                "latency",
                "never rejects",
                |value: Value| async move {
                    let delay = if value == json!("slow") { 100 } else { 10 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    Ok(true)
                },
            )),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    let first = model.set_field("field", json!("slow"));
    let second = model.set_field("field", json!("fast"));
    let (v1, v2) = tokio::join!(first, second);

    assert!(v1, "superseded call still reports its own verdict");
    assert!(v2);
    assert_eq!(
        model.get_field("field"),
        Some(json!("fast")),
        "the newer set owns the final state even though it resolved first"
    );
    assert!(model.dirty_data().is_empty());
}

#[tokio::test]
async fn slow_rejection_cannot_dirty_a_field_after_a_newer_accept() {
    let schema = ModelSchema::builder()
        .field(
            "field",
            FieldSchema::string().rule(Rule::new_async(
                "picky",
                "Rejected",
                |value: Value| async move {
                    if value == json!("bad-slow") {
                        tokio::time::sleep(Duration::from_millis(80)).await;
                        Ok(false)
                    } else {
                        Ok(true)
                    }
                },
            )),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    let first = model.set_field("field", json!("bad-slow"));
    let second = model.set_field("field", json!("good"));
    let (v1, v2) = tokio::join!(first, second);

    assert!(!v1);
    assert!(v2);
    assert_eq!(model.get_field("field"), Some(json!("good")));
    assert!(
        model.dirty_data().is_empty(),
        "stale rejection must not park a dirty value"
    );
    assert!(model.validation_errors().is_empty());
}

// ============================================================================
// Batched update with a shared reaction
// ============================================================================

#[tokio::test]
async fn batch_update_computes_the_sum_once() {
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
    assert_eq!(computes.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Reaction chain
// ============================================================================

#[tokio::test]
async fn two_hop_chain_propagates_through_intermediate_commits() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().default_value(json!(0)))
        .field(
            "b",
            FieldSchema::number().react(Reaction::new(&["a"], |deps| {
                Ok(json!(deps["a"].as_f64().unwrap_or(0.0) * 2.0))
            })),
        )
        .field(
            "c",
            FieldSchema::number().react(Reaction::new(&["b"], |deps| {
                Ok(json!(deps["b"].as_f64().unwrap_or(0.0) + 1.0))
            })),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    model.set_field("a", json!(10)).await;
    model.settled().await;

    assert_eq!(model.get_field("b"), Some(json!(20.0)));
    assert_eq!(model.get_field("c"), Some(json!(21.0)));
}

// ============================================================================
// Debounced collapse
// ============================================================================

#[tokio::test]
async fn rapid_sets_collapse_to_one_debounced_run() {
    let computes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&computes);

    let schema = ModelSchema::builder()
        .field("input", FieldSchema::string().default_value(json!("")))
        .field(
            "output",
            FieldSchema::string()
                .default_value(json!(""))
                .react(Reaction::new(&["input"], move |deps| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let s = deps["input"].as_str().unwrap_or_default();
                    Ok(json!(s.to_uppercase()))
                })),
        )
        .build();
    let model = FormModel::new(
        schema,
        ModelOptions {
            debounce_reactions_ms: 50,
            ..Default::default()
        },
    );

    model.set_field("input", json!("a")).await;
    model.set_field("input", json!("b")).await;
    model.set_field("input", json!("c")).await;

    assert_eq!(
        model.get_field("output"),
        Some(json!("")),
        "nothing computed inside the debounce window"
    );

    model.settled().await;

    assert_eq!(model.get_field("output"), Some(json!("C")));
    assert_eq!(computes.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Circular dependency
// ============================================================================

#[tokio::test]
async fn mutual_reactions_terminate_with_one_circular_record() {
    let schema = ModelSchema::builder()
        .field(
            "x",
            FieldSchema::number()
                .default_value(json!(0))
                .react(Reaction::new(&["y"], |deps| {
                    Ok(json!(deps["y"].as_f64().unwrap_or(0.0) + 1.0))
                })),
        )
        .field(
            "y",
            FieldSchema::number()
                .default_value(json!(0))
                .react(Reaction::new(&["x"], |deps| {
                    Ok(json!(deps["x"].as_f64().unwrap_or(0.0) + 1.0))
                })),
        )
        .build();
    let model = FormModel::with_defaults(schema);

    let cycles = Arc::new(AtomicUsize::new(0));
    {
        let cycles = Arc::clone(&cycles);
        model.on("reaction:error", move |_| {
            cycles.fetch_add(1, Ordering::SeqCst);
        });
    }

    // Terminates: the second hop is refused instead of recursing.
    model.set_field("x", json!(1)).await;
    model.settled().await;

    assert_eq!(model.get_field("x"), Some(json!(1)));
    assert_eq!(model.get_field("y"), Some(json!(2.0)), "first hop still ran");
    assert_eq!(cycles.load(Ordering::SeqCst), 1);

    let errors = model.validation_errors();
    let reaction_errors = errors.get("__reactions").expect("cycle recorded");
    assert_eq!(reaction_errors.len(), 1);
    assert_eq!(reaction_errors[0].rule, "circular_dependency");
    assert!(
        reaction_errors[0].message.contains("x -> x"),
        "bad path: {}",
        reaction_errors[0].message
    );
}

// ============================================================================
// Async timeout
// ============================================================================

#[tokio::test]
async fn validator_outliving_the_timeout_rejects_the_set() {
    let schema = ModelSchema::builder()
        .field(
            "slow",
            FieldSchema::string().rule(Rule::new_async(
                "glacial",
                "eventually fine",
                |_value| async {
                    tokio::time::sleep(Duration::from_millis(10_000)).await;
                    Ok(true)
                },
            )),
        )
        .build();
    let model = FormModel::new(
        schema,
        ModelOptions {
            async_validation_timeout_ms: 100,
            ..Default::default()
        },
    );

    let ok = model.set_field("slow", json!("v")).await;

    assert!(!ok);
    assert_eq!(model.dirty_data().get("slow"), Some(&json!("v")));

    let errors = model.validation_errors();
    let slow_errors = errors.get("slow").expect("timeout recorded");
    assert_eq!(slow_errors[0].rule, "validation_error");
    assert!(
        slow_errors[0].message.contains("Validation timeout"),
        "bad message: {}",
        slow_errors[0].message
    );
}
