//! FieldSchema — the declaration of a single model field: value kind,
//! rules, default, transform, and reactions.

use std::sync::Arc;

use serde_json::Value;

use crate::reaction::Reaction;
use crate::rules::Rule;

/// Closure type for value transforms, applied before validation.
pub type TransformFn = dyn Fn(Value) -> Value + Send + Sync;

/// The closed set of declared value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Date,
    Enum,
}

/// Declaration of one model field.
#[derive(Clone)]
pub struct FieldSchema {
    kind: FieldKind,
    rules: Vec<Rule>,
    default: Option<Value>,
    transform: Option<Arc<TransformFn>>,
    reactions: Vec<Reaction>,
}

impl FieldSchema {
    /// Declare a field of the given kind.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            rules: Vec::new(),
            default: None,
            transform: None,
            reactions: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn object() -> Self {
        Self::new(FieldKind::Object)
    }

    pub fn array() -> Self {
        Self::new(FieldKind::Array)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    pub fn enumeration() -> Self {
        Self::new(FieldKind::Enum)
    }

    /// Append one validation rule. Rules run in declaration order.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append several validation rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Set the initial committed value. Absent means the field starts with
    /// no value.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Set a pure transform applied to candidates before validation.
    pub fn transform(mut self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Attach a reaction. A field may carry several reactions with disjoint
    /// dependency sets; each fires independently.
    pub fn react(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    /// The declared value kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// The field's rules, in declaration order.
    pub fn field_rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The declared default value, if any.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The reactions attached to this field.
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub(crate) fn apply_transform(&self, value: Value) -> Value {
        match &self.transform {
            Some(f) => f(value),
            None => value,
        }
    }
}

impl std::fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSchema")
            .field("kind", &self.kind)
            .field("rules", &self.rules)
            .field("default", &self.default)
            .field("transform", &self.transform.as_ref().map(|_| "<fn>"))
            .field("reactions", &self.reactions)
            .finish()
    }
}
