//! Tests for `FormModel::dispose` and the dirty-store helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use formwork::model::{FormModel, ModelOptions};
use formwork::reaction::Reaction;
use formwork::rules::min;
use formwork::schema::{FieldSchema, ModelSchema};

// ============================================================================
// Dirty helpers
// ============================================================================

#[tokio::test]
async fn clear_dirty_drops_candidates_but_keeps_data_and_errors() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().default_value(json!(1)))
        .field("b", FieldSchema::number().rule(min(10.0)))
        .build();
    let model = FormModel::with_defaults(schema);

    model.set_field("b", json!(5)).await;
    assert!(!model.dirty_data().is_empty());

    model.clear_dirty();

    assert!(model.dirty_data().is_empty());
    assert_eq!(model.get_field("a"), Some(json!(1)), "data untouched");
    assert!(
        !model.validation_errors().is_empty(),
        "errors untouched by clear_dirty"
    );
}

#[tokio::test]
async fn dirty_data_returns_a_snapshot() {
    let schema = ModelSchema::builder()
        .field("b", FieldSchema::number().rule(min(10.0)))
        .build();
    let model = FormModel::with_defaults(schema);

    model.set_field("b", json!(5)).await;
    let mut snapshot = model.dirty_data();
    snapshot.insert("b".to_string(), json!(999));

    assert_eq!(
        model.dirty_data().get("b"),
        Some(&json!(5)),
        "mutating the snapshot must not affect the model"
    );
}

// ============================================================================
// Dispose
// ============================================================================

#[tokio::test]
async fn dispose_empties_all_state() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number().default_value(json!(1)))
        .field("b", FieldSchema::number().rule(min(10.0)))
        .build();
    let model = FormModel::with_defaults(schema);
    model.set_field("b", json!(5)).await;

    model.dispose();

    assert!(model.is_disposed());
    assert!(model.data().is_empty());
    assert!(model.dirty_data().is_empty());
    assert!(model.validation_errors().is_empty());
}

#[tokio::test]
async fn operations_after_dispose_are_refused() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number())
        .build();
    let model = FormModel::with_defaults(schema);
    model.dispose();

    assert!(!model.set_field("a", json!(1)).await);
    assert!(model.get_field("a").is_none());
    assert!(!model.validate_all().await);
}

#[tokio::test]
async fn dispose_cancels_pending_debounced_reactions() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let schema = ModelSchema::builder()
        .field("input", FieldSchema::string().default_value(json!("")))
        .field(
            "output",
            FieldSchema::string().react(Reaction::new(&["input"], move |deps| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(deps["input"].clone())
            })),
        )
        .build();
    let model = FormModel::new(
        schema,
        ModelOptions {
            debounce_reactions_ms: 40,
            ..Default::default()
        },
    );

    model.set_field("input", json!("x")).await;
    model.dispose();

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(
        runs.load(Ordering::SeqCst),
        0,
        "timer cancelled by dispose must never fire"
    );
}

#[tokio::test]
async fn dispose_removes_event_listeners() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number())
        .build();
    let model = FormModel::with_defaults(schema);
    let seen = Arc::new(AtomicUsize::new(0));
    {
        let seen = Arc::clone(&seen);
        model.on("field:change", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
    }

    model.dispose();
    model.set_field("a", json!(1)).await;

    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn double_dispose_is_safe() {
    let schema = ModelSchema::builder()
        .field("a", FieldSchema::number())
        .build();
    let model = FormModel::with_defaults(schema);

    model.dispose();
    model.dispose();

    assert!(model.is_disposed());
}

#[tokio::test]
async fn settled_resolves_after_dispose() {
    let schema = ModelSchema::builder()
        .field("input", FieldSchema::string())
        .field(
            "output",
            FieldSchema::string().react(Reaction::new(&["input"], |deps| {
                Ok(deps["input"].clone())
            })),
        )
        .build();
    let model = FormModel::new(
        schema,
        ModelOptions {
            debounce_reactions_ms: 40,
            ..Default::default()
        },
    );

    model.set_field("input", json!("x")).await;
    model.dispose();
    model.settled().await;
}
