//! FormModel — the model coordinator.
//!
//! Owns the authoritative field state (`data`), the shadow store of
//! rejected candidates (`dirty`), the error map, and the per-field request
//! tickets. Orchestrates transform → validate → commit, emits events, and
//! fans out to the reaction graph.
//!
//! # Threading model
//!
//! `FormModel` is `Send + Sync`. All state lives behind a single
//! `parking_lot::Mutex` that is **never held across an await or a user
//! callback**: the lock is taken to bump tickets, taken again after
//! validation to check the ticket and commit, and released before events
//! are emitted or reactions fan out. "Latest ticket wins" holds because
//! the ticket re-read and the commit happen under the same lock
//! acquisition.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::classify::{ErrorClassifier, ErrorKind, ErrorRecord};
use crate::error::{FieldError, REACTION_ERRORS_KEY};
use crate::events::{
    EventBus, ListenerId, ModelEvent, FIELD_CHANGE, FIELD_NOT_FOUND, REACTION_ERROR,
    VALIDATION_COMPLETE, VALIDATION_ERROR,
};
use crate::reaction::{ReactionGraph, ReactionHost};
use crate::schema::ModelSchema;
use crate::validate::validate_field;

use super::options::{ErrorFormatterFn, ModelOptions};

// ============================================================================
// State
// ============================================================================

struct ModelState {
    /// Last-committed value per field. Mutated only on successful validation.
    data: Map<String, Value>,
    /// Most recently rejected candidate per field.
    dirty: Map<String, Value>,
    /// Per-field error lists; `__reactions` accumulates reaction failures.
    errors: BTreeMap<String, Vec<FieldError>>,
    /// Monotonic per-field ticket; only the latest may mutate state.
    request_ids: HashMap<String, u64>,
}

// ============================================================================
// ModelInner
// ============================================================================

pub(crate) struct ModelInner {
    schema: ModelSchema,
    state: Mutex<ModelState>,
    graph: Arc<ReactionGraph>,
    bus: Arc<EventBus<ModelEvent>>,
    classifier: Arc<ErrorClassifier>,
    owns_classifier: bool,
    timeout: Duration,
    fail_fast: bool,
    error_formatter: Option<Arc<ErrorFormatterFn>>,
    disposed: AtomicBool,
    /// Weak self-reference so the inner can hand itself to the graph as a
    /// `ReactionHost` (set via `Arc::new_cyclic`).
    me: Weak<ModelInner>,
}

impl ModelInner {
    fn host(&self) -> Arc<dyn ReactionHost> {
        self.me.upgrade().expect("model inner outlives its tasks")
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Core set path shared by the public API, batch updates, and reaction
    /// commits.
    async fn set_field(
        &self,
        field: &str,
        value: Value,
        stack: Vec<String>,
        suppress_reactions: bool,
    ) -> bool {
        if self.is_disposed() {
            return false;
        }
        let Some(field_schema) = self.schema.get(field) else {
            self.classifier.trigger(&ErrorRecord::field_not_found(field));
            return false;
        };

        let ticket = {
            let mut st = self.state.lock();
            let id = st.request_ids.entry(field.to_string()).or_insert(0);
            *id += 1;
            *id
        };

        let transformed = field_schema.apply_transform(value);
        let data_snapshot = { self.state.lock().data.clone() };

        let mut pending_errors = Vec::new();
        let valid = validate_field(
            field,
            field_schema.field_rules(),
            &transformed,
            &data_snapshot,
            self.timeout,
            &self.classifier,
            self.fail_fast,
            &mut pending_errors,
        )
        .await;

        let changed = {
            let mut st = self.state.lock();
            // A later call superseded this one while we awaited validation:
            // report our own verdict but leave all state to the winner.
            if st.request_ids.get(field).copied() != Some(ticket) {
                return valid;
            }
            if pending_errors.is_empty() {
                st.errors.remove(field);
            } else {
                st.errors.insert(field.to_string(), pending_errors);
            }
            if valid {
                st.dirty.remove(field);
                if st.data.get(field) == Some(&transformed) {
                    false
                } else {
                    st.data.insert(field.to_string(), transformed.clone());
                    true
                }
            } else {
                st.dirty.insert(field.to_string(), transformed.clone());
                false
            }
        };

        if changed {
            self.bus.emit(
                FIELD_CHANGE,
                &ModelEvent::FieldChange {
                    field: field.to_string(),
                    value: transformed,
                },
            );
            if !suppress_reactions {
                let host = self.host();
                self.graph.trigger(&host, field, &stack).await;
            }
        }
        valid
    }

    async fn set_fields(&self, values: Map<String, Value>) -> bool {
        if self.is_disposed() {
            return false;
        }
        let input_fields: Vec<String> = values.keys().cloned().collect();

        let verdicts = join_all(values.into_iter().map(|(field, value)| async move {
            self.set_field(&field, value, Vec::new(), true).await
        }))
        .await;
        let all_valid = verdicts.into_iter().all(|v| v);

        // Reactions key on dependency-field identity, not change detection;
        // the batch triggers over the input names and deep-equality on each
        // downstream commit filters true no-ops.
        let host = self.host();
        self.graph.trigger_batch(&host, &input_fields).await;

        all_valid
    }

    async fn validate_all(&self) -> bool {
        if self.is_disposed() {
            return false;
        }
        let field_names: Vec<String> = self.schema.fields().keys().cloned().collect();
        let mut all_valid = true;

        for field in field_names {
            let Some(field_schema) = self.schema.get(&field) else {
                continue;
            };
            let (candidate, data_snapshot) = {
                let mut st = self.state.lock();
                st.errors.remove(&field);
                let candidate = st
                    .dirty
                    .get(&field)
                    .or_else(|| st.data.get(&field))
                    .cloned();
                (candidate, st.data.clone())
            };

            let candidate_value = candidate.clone().unwrap_or(Value::Null);
            let mut pending_errors = Vec::new();
            let valid = validate_field(
                &field,
                field_schema.field_rules(),
                &candidate_value,
                &data_snapshot,
                self.timeout,
                &self.classifier,
                self.fail_fast,
                &mut pending_errors,
            )
            .await;

            let mut committed: Option<Value> = None;
            {
                let mut st = self.state.lock();
                if !pending_errors.is_empty() {
                    st.errors.insert(field.clone(), pending_errors);
                }
                if valid {
                    st.dirty.remove(&field);
                    if let Some(cand) = &candidate {
                        if st.data.get(&field) != Some(cand) {
                            st.data.insert(field.clone(), cand.clone());
                            committed = Some(cand.clone());
                        }
                    }
                } else {
                    all_valid = false;
                    if let Some(cand) = candidate {
                        st.dirty.insert(field.clone(), cand);
                    }
                }
            }

            if let Some(value) = committed {
                self.bus.emit(
                    FIELD_CHANGE,
                    &ModelEvent::FieldChange {
                        field: field.clone(),
                        value,
                    },
                );
                let host = self.host();
                self.graph.trigger(&host, &field, &[]).await;
            }
        }

        self.bus.emit(
            VALIDATION_COMPLETE,
            &ModelEvent::ValidationComplete {
                is_valid: all_valid,
            },
        );
        all_valid
    }

    fn validation_summary(&self) -> String {
        let errors: Vec<FieldError> = {
            let st = self.state.lock();
            st.errors.values().flatten().cloned().collect()
        };
        if errors.is_empty() {
            return "Validation passed".to_string();
        }
        // Lock released above: the formatter is user code.
        errors
            .iter()
            .map(|e| match &self.error_formatter {
                Some(format) => format(e),
                None => format!("{}: {}", e.field, e.message),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.graph.dispose();
        self.bus.clear();
        if self.owns_classifier {
            self.classifier.clear();
        }
        let mut st = self.state.lock();
        st.data.clear();
        st.dirty.clear();
        st.errors.clear();
        st.request_ids.clear();
    }
}

#[async_trait]
impl ReactionHost for ModelInner {
    fn value_of(&self, field: &str) -> Option<Value> {
        self.state.lock().data.get(field).cloned()
    }

    async fn commit_computed(&self, field: &str, value: Value, stack: Vec<String>) -> bool {
        self.set_field(field, value, stack, false).await
    }

    fn report(&self, record: ErrorRecord) {
        if !self.is_disposed() {
            let entry = FieldError::new(
                record.field.clone().unwrap_or_default(),
                record.kind.tag(),
                record.message.clone(),
            );
            self.state
                .lock()
                .errors
                .entry(REACTION_ERRORS_KEY.to_string())
                .or_default()
                .push(entry);
        }
        self.classifier.trigger(&record);
    }
}

// ============================================================================
// FormModel — public handle
// ============================================================================

/// A reactive, schema-driven data model.
///
/// Construct with [`FormModel::new`]; all methods take `&self`.
pub struct FormModel {
    inner: Arc<ModelInner>,
}

impl FormModel {
    /// Create a model from `schema` with the given options.
    ///
    /// Fields with declared defaults start committed to those defaults; no
    /// `field:change` events are emitted for initialization.
    pub fn new(schema: ModelSchema, options: ModelOptions) -> Self {
        let bus = Arc::new(EventBus::new());
        let owns_classifier = options.error_handler.is_none();
        let classifier = options
            .error_handler
            .unwrap_or_else(|| Arc::new(ErrorClassifier::new()));

        // Forward classified errors onto the event bus.
        {
            let b = Arc::clone(&bus);
            classifier.on_error(ErrorKind::Validation, move |rec| {
                b.emit(VALIDATION_ERROR, &ModelEvent::ValidationError(rec.clone()));
            });
            let b = Arc::clone(&bus);
            classifier.on_error(ErrorKind::Reaction, move |rec| {
                b.emit(REACTION_ERROR, &ModelEvent::ReactionError(rec.clone()));
            });
            let b = Arc::clone(&bus);
            classifier.on_error(ErrorKind::CircularDependency, move |rec| {
                b.emit(REACTION_ERROR, &ModelEvent::ReactionError(rec.clone()));
            });
            let b = Arc::clone(&bus);
            classifier.on_error(ErrorKind::FieldNotFound, move |rec| {
                b.emit(FIELD_NOT_FOUND, &ModelEvent::FieldNotFound(rec.clone()));
            });
        }

        let graph = Arc::new(ReactionGraph::new(
            schema.reaction_pairs(),
            options.debounce_reactions_ms,
        ));
        let data = schema.defaults();

        let inner = Arc::new_cyclic(|me| ModelInner {
            schema,
            state: Mutex::new(ModelState {
                data,
                dirty: Map::new(),
                errors: BTreeMap::new(),
                request_ids: HashMap::new(),
            }),
            graph,
            bus,
            classifier,
            owns_classifier,
            timeout: Duration::from_millis(options.async_validation_timeout_ms),
            fail_fast: options.fail_fast,
            error_formatter: options.error_formatter,
            disposed: AtomicBool::new(false),
            me: me.clone(),
        });

        Self { inner }
    }

    /// Create a model with default options.
    pub fn with_defaults(schema: ModelSchema) -> Self {
        Self::new(schema, ModelOptions::default())
    }

    /// Set one field: transform, validate, and commit on success.
    ///
    /// Returns the validation verdict. A `false` return means the candidate
    /// is held in the dirty store and `data` is untouched. Setting an
    /// undeclared field classifies `FieldNotFound`, emits
    /// `field:not-found`, and returns false without mutating state.
    pub async fn set_field(&self, field: &str, value: Value) -> bool {
        self.inner.set_field(field, value, Vec::new(), false).await
    }

    /// Set several fields concurrently, then fan out reactions once per
    /// distinct dependent reaction. Returns the conjunction of verdicts.
    pub async fn set_fields(&self, values: Map<String, Value>) -> bool {
        self.inner.set_fields(values).await
    }

    /// The last-committed value of `field`, or `None`.
    pub fn get_field(&self, field: &str) -> Option<Value> {
        self.inner.state.lock().data.get(field).cloned()
    }

    /// Snapshot of all committed values.
    pub fn data(&self) -> Map<String, Value> {
        self.inner.state.lock().data.clone()
    }

    /// Snapshot of rejected candidates awaiting retry.
    pub fn dirty_data(&self) -> Map<String, Value> {
        self.inner.state.lock().dirty.clone()
    }

    /// Drop all rejected candidates. Committed data, errors, and pending
    /// work are untouched.
    pub fn clear_dirty(&self) {
        self.inner.state.lock().dirty.clear();
    }

    /// Re-validate every declared field, preferring its dirty candidate
    /// over its committed value. Valid candidates are committed (with
    /// change events and reaction fan-out); invalid ones stay dirty.
    /// Emits `validation:complete` and returns the conjunction.
    pub async fn validate_all(&self) -> bool {
        self.inner.validate_all().await
    }

    /// `"Validation passed"`, or every recorded error formatted and joined
    /// with `"; "`.
    pub fn validation_summary(&self) -> String {
        self.inner.validation_summary()
    }

    /// Snapshot of the error map. Reaction failures accumulate under the
    /// `__reactions` key.
    pub fn validation_errors(&self) -> BTreeMap<String, Vec<FieldError>> {
        self.inner.state.lock().errors.clone()
    }

    /// Subscribe to a model event (`field:change`, `field:not-found`,
    /// `validation:error`, `validation:complete`, `reaction:error`).
    pub fn on(
        &self,
        event: &str,
        callback: impl Fn(&ModelEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.bus.on(event, callback)
    }

    /// Subscribe for a single invocation.
    pub fn once(
        &self,
        event: &str,
        callback: impl Fn(&ModelEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.bus.once(event, callback)
    }

    /// Remove one listener.
    pub fn off(&self, event: &str, id: ListenerId) {
        self.inner.bus.off(event, id);
    }

    /// Remove every listener for `event`.
    pub fn off_all(&self, event: &str) {
        self.inner.bus.off_all(event);
    }

    /// The model's error classifier, for per-kind error subscriptions.
    pub fn classifier(&self) -> &Arc<ErrorClassifier> {
        &self.inner.classifier
    }

    /// Resolve once no debounced timers or in-flight reactions remain,
    /// plus one trailing yield for work queued in the final tick.
    pub async fn settled(&self) {
        self.inner.graph.settled().await;
        tokio::task::yield_now().await;
    }

    /// Tear down: cancel timers, resolve pending reaction futures, clear
    /// listeners and all state. Further operations are no-ops returning
    /// `false` or empty snapshots.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}
