//! Model schema builder.
//!
//! Schema definition errors are programmer errors, so the builder panics on
//! misuse: invalid or reserved field names, duplicate declarations, and
//! reaction dependencies that name undeclared fields.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::error::REACTION_ERRORS_KEY;
use crate::reaction::Reaction;

use super::field::FieldSchema;

static NAME_REGEX: OnceLock<regex::Regex> = OnceLock::new();

fn name_regex() -> &'static regex::Regex {
    NAME_REGEX.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("name regex is valid")
    })
}

/// A complete, validated model schema.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    fields: BTreeMap<String, FieldSchema>,
}

impl ModelSchema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            fields: BTreeMap::new(),
        }
    }

    /// All declared fields.
    pub fn fields(&self) -> &BTreeMap<String, FieldSchema> {
        &self.fields
    }

    /// Look up one field's declaration.
    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    /// Whether `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The initial data map: every declared default, keyed by field name.
    pub fn defaults(&self) -> Map<String, Value> {
        let mut data = Map::new();
        for (name, field) in &self.fields {
            if let Some(default) = field.default() {
                data.insert(name.clone(), default.clone());
            }
        }
        data
    }

    /// Every `(owner field, reaction)` pair, in field order.
    pub(crate) fn reaction_pairs(&self) -> Vec<(String, Reaction)> {
        let mut pairs = Vec::new();
        for (name, field) in &self.fields {
            for reaction in field.reactions() {
                pairs.push((name.clone(), reaction.clone()));
            }
        }
        pairs
    }
}

/// Fluent schema builder. Finish with [`SchemaBuilder::build`].
#[derive(Debug)]
pub struct SchemaBuilder {
    fields: BTreeMap<String, FieldSchema>,
}

impl SchemaBuilder {
    /// Declare a field.
    ///
    /// Panics if `name` is reserved, malformed, or already declared.
    pub fn field(mut self, name: &str, field: FieldSchema) -> Self {
        if name == REACTION_ERRORS_KEY {
            panic!("Field name \"{name}\" is reserved for reaction error records.");
        }
        if !name_regex().is_match(name) {
            panic!(
                "Field name \"{name}\" contains invalid characters. Field names must start \
                 with a letter or underscore and contain only alphanumeric characters and \
                 underscores."
            );
        }
        if self.fields.contains_key(name) {
            panic!("Field \"{name}\" is already declared.");
        }
        self.fields.insert(name.to_string(), field);
        self
    }

    /// Finalize the schema.
    ///
    /// Panics if any reaction's dependency list names an undeclared field.
    pub fn build(self) -> ModelSchema {
        for (name, field) in &self.fields {
            for reaction in field.reactions() {
                for dep in reaction.deps() {
                    if !self.fields.contains_key(dep) {
                        panic!(
                            "Reaction on field \"{name}\" depends on unknown field \"{dep}\"."
                        );
                    }
                }
            }
        }
        ModelSchema {
            fields: self.fields,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
