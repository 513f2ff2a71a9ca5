//! ErrorClassifier — per-kind error subscription and dispatch.
//!
//! Subscribers register for an exact [`ErrorKind`]; `Unknown` doubles as a
//! catch-all that observes every record of every kind. Dispatch is
//! synchronous, in registration order, exact-kind subscribers first.
//!
//! Internal state sits behind a `parking_lot::Mutex` that is released
//! before any callback runs, so callbacks may re-enter the classifier.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::events::ListenerId;

use super::record::{ErrorKind, ErrorRecord};

/// Closure type for error subscribers.
pub type ErrorCallbackFn = dyn Fn(&ErrorRecord) + Send + Sync;

/// Per-kind error dispatcher.
pub struct ErrorClassifier {
    subscribers: Mutex<HashMap<ErrorKind, Vec<(ListenerId, Arc<ErrorCallbackFn>)>>>,
    next_id: AtomicU64,
}

impl ErrorClassifier {
    /// Create a classifier with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe `callback` to records of `kind`.
    ///
    /// Subscribing to [`ErrorKind::Unknown`] observes every record.
    pub fn on_error(
        &self,
        kind: ErrorKind,
        callback: impl Fn(&ErrorRecord) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove the subscriber identified by `id` from `kind`.
    ///
    /// Does nothing if `id` is not present.
    pub fn off_error(&self, kind: ErrorKind, id: ListenerId) {
        let mut subs = self.subscribers.lock();
        if let Some(list) = subs.get_mut(&kind) {
            list.retain(|(lid, _)| *lid != id);
            if list.is_empty() {
                subs.remove(&kind);
            }
        }
    }

    /// Dispatch `record` to every subscriber for its exact kind, then to
    /// every `Unknown` catch-all subscriber, in registration order.
    ///
    /// A record whose kind is already `Unknown` is dispatched once.
    /// Subscriber panics are caught and logged; they never abort dispatch.
    pub fn trigger(&self, record: &ErrorRecord) {
        let snapshot: Vec<Arc<ErrorCallbackFn>> = {
            let subs = self.subscribers.lock();
            let mut snapshot: Vec<Arc<ErrorCallbackFn>> = subs
                .get(&record.kind)
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default();
            if record.kind != ErrorKind::Unknown {
                if let Some(list) = subs.get(&ErrorKind::Unknown) {
                    snapshot.extend(list.iter().map(|(_, cb)| Arc::clone(cb)));
                }
            }
            snapshot
        };

        for cb in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(record)));
            if result.is_err() {
                tracing::warn!(
                    kind = record.kind.tag(),
                    "error subscriber panicked; continuing with remaining subscribers"
                );
            }
        }
    }

    /// Remove every subscriber of every kind.
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
