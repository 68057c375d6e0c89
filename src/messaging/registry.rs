use super::EventKind;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock, Weak};

/// Callback invoked with the payload of each matching event.
pub type EventCallback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

struct Binding {
    id: u64,
    callback: EventCallback,
}

struct RegistryInner {
    next_id: u64,
    bindings: HashMap<EventKind, Vec<Binding>>,
}

/// In-memory pub/sub map routing inbound and local events to application callbacks.
///
/// Callbacks for a given kind run in registration order. The same closure may be
/// registered any number of times; each registration counts separately and is
/// removed individually via its [`SubscriptionHandle`]. A panicking callback is
/// caught and logged and does not stop the remaining callbacks.
pub struct SubscriptionRegistry {
    inner: RwLock<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                next_id: 0,
                bindings: HashMap::new(),
            }),
        }
    }

    /// Registers a callback for an event kind and returns its disposer handle.
    ///
    /// Dropping the handle (or calling [`SubscriptionHandle::unsubscribe`])
    /// removes exactly this registration. Call [`SubscriptionHandle::detach`]
    /// to keep the subscription for the lifetime of the registry instead.
    pub fn subscribe<F>(self: &Arc<Self>, kind: EventKind, callback: F) -> SubscriptionHandle
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.next_id += 1;
            let id = inner.next_id;
            inner.bindings.entry(kind.clone()).or_default().push(Binding {
                id,
                callback: Arc::new(callback),
            });
            id
        };

        SubscriptionHandle {
            kind,
            id,
            registry: Arc::downgrade(self),
            detached: false,
        }
    }

    /// Invokes every currently-registered callback for `kind`, in registration
    /// order, with the given payload.
    ///
    /// The callback list is snapshotted up front, so subscribing or emitting
    /// from inside a callback is safe; such changes are unordered relative to
    /// the in-progress emission.
    pub fn emit(&self, kind: &EventKind, payload: &serde_json::Value) {
        let callbacks: Vec<EventCallback> = {
            let inner = self.inner.read().expect("registry lock poisoned");
            match inner.bindings.get(kind) {
                Some(bindings) => bindings.iter().map(|b| Arc::clone(&b.callback)).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                tracing::error!("subscriber callback for '{}' panicked", kind);
            }
        }
    }

    /// Number of live registrations for `kind`
    pub fn subscriber_count(&self, kind: &EventKind) -> usize {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.bindings.get(kind).map_or(0, Vec::len)
    }

    fn remove(&self, kind: &EventKind, id: u64) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        if let Some(bindings) = inner.bindings.get_mut(kind) {
            bindings.retain(|b| b.id != id);
            if bindings.is_empty() {
                inner.bindings.remove(kind);
            }
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a single registration in the [`SubscriptionRegistry`].
///
/// The subscription lives until the handle is dropped or explicitly
/// unsubscribed; it survives disconnect/reconnect cycles of the client.
#[must_use = "dropping the handle unsubscribes; call detach() to keep the subscription"]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
    registry: Weak<SubscriptionRegistry>,
    detached: bool,
}

impl SubscriptionHandle {
    /// Removes exactly this registration.
    pub fn unsubscribe(mut self) {
        self.remove_binding();
        self.detached = true;
    }

    /// Leaves the subscription registered for the lifetime of the registry.
    pub fn detach(mut self) {
        self.detached = true;
    }

    /// The event kind this handle is subscribed to
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    fn remove_binding(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.kind, self.id);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if !self.detached {
            self.remove_binding();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_emit_runs_callbacks_in_registration_order() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        let h1 = registry.subscribe(EventKind::Notification, move |_| o1.lock().unwrap().push(1));
        let o2 = Arc::clone(&order);
        let h2 = registry.subscribe(EventKind::Notification, move |_| o2.lock().unwrap().push(2));

        registry.emit(&EventKind::Notification, &serde_json::Value::Null);

        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
        drop(h1);
        drop(h2);
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_the_next_one() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let second_ran = Arc::new(AtomicUsize::new(0));

        let h1 = registry.subscribe(EventKind::Notification, |_| panic!("subscriber bug"));
        let ran = Arc::clone(&second_ran);
        let h2 = registry.subscribe(EventKind::Notification, move |_| {
            ran.fetch_add(1, Ordering::SeqCst);
        });

        // Must not propagate the panic to the emitter
        registry.emit(&EventKind::Notification, &serde_json::Value::Null);

        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
        drop(h1);
        drop(h2);
    }

    #[test]
    fn test_unsubscribe_removes_exactly_one_registration() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&calls);
        let h1 = registry.subscribe(EventKind::Notification, move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&calls);
        let h2 = registry.subscribe(EventKind::Notification, move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        h1.unsubscribe();
        registry.emit(&EventKind::Notification, &serde_json::Value::Null);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        drop(h2);
    }

    #[test]
    fn test_dropping_handle_unsubscribes() {
        let registry = Arc::new(SubscriptionRegistry::new());
        {
            let _handle = registry.subscribe(EventKind::MetricsUpdate, |_| {});
            assert_eq!(registry.subscriber_count(&EventKind::MetricsUpdate), 1);
        }
        assert_eq!(registry.subscriber_count(&EventKind::MetricsUpdate), 0);
    }

    #[test]
    fn test_detach_keeps_subscription_alive() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.subscribe(EventKind::MetricsUpdate, |_| {}).detach();
        assert_eq!(registry.subscriber_count(&EventKind::MetricsUpdate), 1);
    }

    #[test]
    fn test_reentrant_subscribe_during_emit_does_not_deadlock() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let registry_inner = Arc::clone(&registry);

        registry
            .subscribe(EventKind::Notification, move |_| {
                registry_inner
                    .subscribe(EventKind::TicketUpdate, |_| {})
                    .detach();
            })
            .detach();

        registry.emit(&EventKind::Notification, &serde_json::Value::Null);
        assert_eq!(registry.subscriber_count(&EventKind::TicketUpdate), 1);
    }

    #[test]
    fn test_emit_without_subscribers_is_a_no_op() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.emit(&EventKind::InvoiceCreated, &serde_json::json!({"x": 1}));
    }
}
