//! Model schema: field declarations and the schema builder.

mod builder;
mod field;

pub use builder::{ModelSchema, SchemaBuilder};
pub use field::{FieldKind, FieldSchema, TransformFn};
