//! In-process fan-out of push events to subscribers.
//!
//! Every [`Subscription`] is a cancellable handle: calling
//! [`Subscription::unsubscribe`] or dropping it removes it from the hub, so
//! tearing down a listener never leaks registrations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::EventKind;

type Registry = HashMap<u64, (EventKind, mpsc::UnboundedSender<Value>)>;

struct Inner {
    next_id: AtomicU64,
    subscribers: Mutex<Registry>,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A panicking subscriber cannot leave the map half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle to one push event hub.
#[derive(Clone)]
pub struct PushHub {
    inner: Arc<Inner>,
}

impl Default for PushHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PushHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushHub")
            .field("subscribers", &self.inner.registry().len())
            .finish()
    }
}

impl PushHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register interest in one event kind.
    pub fn subscribe(&self, kind: EventKind) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.registry().insert(id, (kind, tx));
        Subscription {
            id,
            kind,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `payload` to every live subscription of `kind`.
    ///
    /// Returns the number of subscriptions reached. Subscriptions whose
    /// receiver is gone are pruned.
    pub fn publish(&self, kind: EventKind, payload: Value) -> usize {
        let mut registry = self.inner.registry();
        let mut delivered = 0;
        registry.retain(|_, (k, tx)| {
            if *k != kind {
                return true;
            }
            if tx.send(payload.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                false
            }
        });
        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner
            .registry()
            .values()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

/// Live registration for one event kind.
pub struct Subscription {
    id: u64,
    kind: EventKind,
    rx: mpsc::UnboundedReceiver<Value>,
    hub: Weak<Inner>,
}

impl Subscription {
    /// Next payload, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    fn detach(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.registry().remove(&self.id);
        }
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}
