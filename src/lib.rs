//! formwork — a declarative, schema-driven reactive data model.
//!
//! A caller describes named fields (value kind, transform, ordered rules,
//! default, reactions); the engine owns the authoritative state, runs sync
//! and async validation with per-field request ordering and timeouts,
//! propagates changes through a debounced, cycle-safe reaction graph, and
//! surfaces everything as events and typed error records. Rejected
//! candidates are parked in a shadow "dirty" store for later retry.
//!
//! ```ignore
//! use formwork::model::{FormModel, ModelOptions};
//! use formwork::reaction::Reaction;
//! use formwork::rules::{min, number, required};
//! use formwork::schema::{FieldSchema, ModelSchema};
//! use serde_json::json;
//!
//! let schema = ModelSchema::builder()
//!     .field("price", FieldSchema::number().default_value(json!(0)).rule(number()))
//!     .field("qty", FieldSchema::number().default_value(json!(1)).rules([number(), min(1.0)]))
//!     .field(
//!         "total",
//!         FieldSchema::number().react(Reaction::new(&["price", "qty"], |deps| {
//!             let price = deps["price"].as_f64().unwrap_or(0.0);
//!             let qty = deps["qty"].as_f64().unwrap_or(0.0);
//!             Ok(json!(price * qty))
//!         })),
//!     )
//!     .build();
//!
//! let model = FormModel::new(schema, ModelOptions::default());
//! model.set_field("price", json!(9.5)).await;
//! model.settled().await;
//! assert_eq!(model.get_field("total"), Some(json!(9.5)));
//! ```

pub mod error;

pub mod classify;
pub mod events;
pub mod model;
pub mod reaction;
pub mod rules;
pub mod schema;
pub mod validate;
