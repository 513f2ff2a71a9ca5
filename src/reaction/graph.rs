//! ReactionGraph — reverse dependency index, debounced scheduling, cycle
//! refusal, and the settle barrier.
//!
//! The index is built once at construction and immutable thereafter. Each
//! registered reaction is identified by its index into the registry; that
//! identity is what debounce supersession and batch de-duplication key on.
//!
//! # Threading model
//!
//! `timers` and `in_flight` sit behind `parking_lot::Mutex`es held only for
//! map manipulation, never across an await or a callback. Debounced
//! executions run on spawned tasks that clone the `Arc`s they need
//! (registry, timers, disposed flag).

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::classify::ErrorRecord;

use super::types::{Reaction, ReactionHost};

/// Identity of a registered reaction — its index into the graph's registry.
pub type ReactionId = usize;

/// A reaction together with the field it is attached to.
#[derive(Debug, Clone)]
pub struct RegisteredReaction {
    pub owner: String,
    pub reaction: Reaction,
}

/// Handle for a pending debounce timer. Sending on `cancel` resolves the
/// timer task without executing; `generation` guards against a stale task
/// removing its successor's entry.
struct PendingTimer {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

/// Reverse-indexed reaction scheduler.
pub struct ReactionGraph {
    registry: Arc<Vec<RegisteredReaction>>,
    /// dependency field -> reactions that read it. Built once, never mutated.
    index: HashMap<String, Vec<ReactionId>>,
    debounce: Duration,
    timers: Arc<Mutex<HashMap<ReactionId, PendingTimer>>>,
    in_flight: Arc<Mutex<Vec<JoinHandle<()>>>>,
    timer_generation: AtomicU64,
    disposed: Arc<AtomicBool>,
}

impl ReactionGraph {
    /// Build the graph from `(owner field, reaction)` pairs.
    ///
    /// A reaction with an empty dependency list is registered but never
    /// triggered by field changes.
    pub fn new(reactions: Vec<(String, Reaction)>, debounce_ms: u64) -> Self {
        let registry: Vec<RegisteredReaction> = reactions
            .into_iter()
            .map(|(owner, reaction)| RegisteredReaction { owner, reaction })
            .collect();

        let mut index: HashMap<String, Vec<ReactionId>> = HashMap::new();
        for (id, entry) in registry.iter().enumerate() {
            for dep in entry.reaction.deps() {
                index.entry(dep.clone()).or_default().push(id);
            }
        }

        Self {
            registry: Arc::new(registry),
            index,
            debounce: Duration::from_millis(debounce_ms),
            timers: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(Vec::new())),
            timer_generation: AtomicU64::new(0),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of registered reactions.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True when no reaction is registered.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Fan out to every reaction depending on `changed`.
    ///
    /// `stack` is the propagation path of owner fields already visited on
    /// this chain. A reaction whose owner is on the stack is refused with a
    /// `CircularDependency` record and skipped; siblings still run.
    pub async fn trigger(&self, host: &Arc<dyn ReactionHost>, changed: &str, stack: &[String]) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let Some(ids) = self.index.get(changed) else {
            return;
        };
        for &id in ids {
            let owner = &self.registry[id].owner;
            if stack.iter().any(|visited| visited == owner) {
                host.report(ErrorRecord::circular(stack, owner.clone()));
                continue;
            }
            self.dispatch(host, id, changed.to_string(), stack.to_vec())
                .await;
        }
    }

    /// Fan out once per distinct reaction depending on any of
    /// `changed_fields`.
    ///
    /// The union is de-duplicated by reaction identity; for each reaction
    /// the first matching input field is chosen as its trigger. The
    /// propagation stack starts empty.
    pub async fn trigger_batch(&self, host: &Arc<dyn ReactionHost>, changed_fields: &[String]) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        let mut seen: HashSet<ReactionId> = HashSet::new();
        let mut scheduled: Vec<(ReactionId, String)> = Vec::new();
        for field in changed_fields {
            if let Some(ids) = self.index.get(field) {
                for &id in ids {
                    if seen.insert(id) {
                        scheduled.push((id, field.clone()));
                    }
                }
            }
        }
        for (id, field) in scheduled {
            self.dispatch(host, id, field, Vec::new()).await;
        }
    }

    /// Run immediately (debounce 0) or arm a superseding timer.
    async fn dispatch(
        &self,
        host: &Arc<dyn ReactionHost>,
        id: ReactionId,
        changed: String,
        stack: Vec<String>,
    ) {
        if self.debounce.is_zero() {
            run_reaction(Arc::clone(&self.registry), Arc::clone(host), id, changed, stack).await;
        } else {
            self.schedule_debounced(host, id, changed, stack);
        }
    }

    fn schedule_debounced(
        &self,
        host: &Arc<dyn ReactionHost>,
        id: ReactionId,
        changed: String,
        stack: Vec<String>,
    ) {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let generation = self.timer_generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Supersede: the previous timer task resolves through its cancel
        // channel without executing.
        let superseded = self.timers.lock().insert(
            id,
            PendingTimer {
                generation,
                cancel: cancel_tx,
            },
        );
        if let Some(prev) = superseded {
            let _ = prev.cancel.send(());
        }

        let registry = Arc::clone(&self.registry);
        let host = Arc::clone(host);
        let timers = Arc::clone(&self.timers);
        let disposed = Arc::clone(&self.disposed);
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {
                    {
                        let mut pending = timers.lock();
                        match pending.get(&id) {
                            Some(timer) if timer.generation == generation => {
                                pending.remove(&id);
                            }
                            // Superseded between the sleep elapsing and the
                            // lock being taken.
                            _ => return,
                        }
                    }
                    if disposed.load(Ordering::SeqCst) {
                        return;
                    }
                    run_reaction(registry, host, id, changed, stack).await;
                }
                _ = cancel_rx => {}
            }
        });
        self.in_flight.lock().push(handle);
    }

    /// Resolve once no pending timers and no tracked in-flight work remain.
    ///
    /// A reaction may transitively schedule further reactions while it
    /// executes, so the barrier re-checks after awaiting each drained batch
    /// and yields a tick before concluding the graph is quiet.
    pub async fn settled(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.in_flight.lock());
            if handles.is_empty() {
                tokio::task::yield_now().await;
                if self.in_flight.lock().is_empty() && self.timers.lock().is_empty() {
                    return;
                }
                continue;
            }
            for handle in handles {
                let _ = handle.await;
            }
            tokio::task::yield_now().await;
        }
    }

    /// True while any debounce timer is pending.
    pub fn has_pending_timers(&self) -> bool {
        !self.timers.lock().is_empty()
    }

    /// Cancel every pending timer (resolving their tasks), drop tracked
    /// work, and refuse further scheduling.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let timers: Vec<PendingTimer> = {
            let mut pending = self.timers.lock();
            pending.drain().map(|(_, timer)| timer).collect()
        };
        for timer in timers {
            let _ = timer.cancel.send(());
        }
        self.in_flight.lock().clear();
    }
}

/// Execute one reaction: gather dependencies, compute, commit through the
/// host, then run the action callback.
///
/// A missing dependency is recorded and `Null` passed in its slot;
/// execution continues. Compute failures (an `Err` or a panic) are
/// classified `Reaction` and the commit is skipped. The commit is awaited
/// before the action callback runs.
async fn run_reaction(
    registry: Arc<Vec<RegisteredReaction>>,
    host: Arc<dyn ReactionHost>,
    id: ReactionId,
    changed: String,
    stack: Vec<String>,
) {
    let entry = &registry[id];
    let owner = entry.owner.clone();

    let mut deps = Map::new();
    for dep in entry.reaction.deps() {
        match host.value_of(dep) {
            Some(value) => {
                deps.insert(dep.clone(), value);
            }
            None => {
                host.report(ErrorRecord::dependency_missing(owner.clone(), dep));
                deps.insert(dep.clone(), Value::Null);
            }
        }
    }

    let compute = entry.reaction.compute();
    let computed = match catch_unwind(AssertUnwindSafe(|| compute(&deps))) {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            host.report(ErrorRecord::reaction(owner, e));
            return;
        }
        Err(_) => {
            host.report(ErrorRecord::reaction(owner, "compute panicked"));
            return;
        }
    };

    let mut next_stack = stack;
    next_stack.push(changed);
    host.commit_computed(&owner, computed.clone(), next_stack).await;

    if let Some(action) = entry.reaction.action() {
        let mut payload = deps;
        payload.insert("computed".to_string(), computed);
        let result = catch_unwind(AssertUnwindSafe(|| action(&payload)));
        if result.is_err() {
            host.report(ErrorRecord::reaction(entry.owner.clone(), "action panicked"));
        }
    }
}
