//! EventBus<T> — a named-channel pub/sub primitive.
//!
//! Listeners are stored as `Arc<dyn Fn(&T)>` so snapshots are cheap.
//! Snapshot-on-emit semantics mean:
//!   - A listener removed *during* emission is still called in that round.
//!   - A listener added *during* emission is NOT called until the next emit.
//!   - A `once` listener is unregistered while the snapshot is taken, before
//!     any callback runs, so it fires at most once even if a callback
//!     re-emits the same event.
//!
//! Panics inside a listener are caught and logged; a misbehaving subscriber
//! can never prevent later subscribers from running or abort the emitting
//! call path.
//!
//! All methods take `&self` (interior mutability via `parking_lot::Mutex`),
//! which allows listeners to call `on()`/`off()` during `emit()` without
//! deadlocking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A listener ID returned by [`EventBus::on`] / [`EventBus::once`] that can
/// be passed to [`EventBus::off`] to remove the listener.
pub type ListenerId = u64;

/// Closure type for event listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

struct Listener<T: ?Sized> {
    id: ListenerId,
    once: bool,
    callback: Arc<ListenerFn<T>>,
}

/// Named-channel synchronous event bus.
///
/// `T` is the event payload type; channels are selected by event name.
/// All methods take `&self` — internal state is protected by a
/// `parking_lot::Mutex` that is never held during callbacks.
pub struct EventBus<T> {
    channels: Mutex<HashMap<String, Vec<Listener<T>>>>,
    next_id: AtomicU64,
}

impl<T> EventBus<T> {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback` for `event` and return its [`ListenerId`].
    pub fn on(&self, event: &str, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        self.register(event, false, Arc::new(callback))
    }

    /// Register a one-shot listener: it is removed after its first invocation.
    pub fn once(&self, event: &str, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        self.register(event, true, Arc::new(callback))
    }

    fn register(&self, event: &str, once: bool, callback: Arc<ListenerFn<T>>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels
            .lock()
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, once, callback });
        id
    }

    /// Remove the listener identified by `id` from `event`.
    ///
    /// Does nothing if `id` is not present (safe to call multiple times).
    pub fn off(&self, event: &str, id: ListenerId) {
        let mut channels = self.channels.lock();
        if let Some(listeners) = channels.get_mut(event) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                channels.remove(event);
            }
        }
    }

    /// Remove every listener registered for `event`.
    pub fn off_all(&self, event: &str) {
        self.channels.lock().remove(event);
    }

    /// Remove every listener on every channel.
    pub fn clear(&self) {
        self.channels.lock().clear();
    }

    /// Emit `payload` on `event` to all currently registered listeners, in
    /// registration order.
    ///
    /// A snapshot of the channel is taken before iteration; `once` listeners
    /// are dropped from the live list as part of the snapshot. The lock is
    /// released before any callback runs, so callbacks can safely call
    /// `on()`/`off()`/`emit()`.
    pub fn emit(&self, event: &str, payload: &T) {
        let snapshot: Vec<Arc<ListenerFn<T>>> = {
            let mut channels = self.channels.lock();
            match channels.get_mut(event) {
                None => return,
                Some(listeners) => {
                    let snapshot = listeners
                        .iter()
                        .map(|l| Arc::clone(&l.callback))
                        .collect();
                    listeners.retain(|l| !l.once);
                    if listeners.is_empty() {
                        channels.remove(event);
                    }
                    snapshot
                }
            }
        };

        for cb in snapshot {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(payload)));
            if result.is_err() {
                tracing::warn!(
                    event = %event,
                    "event listener panicked; continuing with remaining listeners"
                );
            }
        }
    }

    /// Number of listeners currently registered for `event`.
    pub fn len(&self, event: &str) -> usize {
        self.channels
            .lock()
            .get(event)
            .map(|l| l.len())
            .unwrap_or(0)
    }

    /// True when no listener is registered for `event`.
    pub fn is_empty(&self, event: &str) -> bool {
        self.len(event) == 0
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
