//! # Subscription Registry
//!
//! Tracks, per resource instance, the consumers currently attached to it, plus a list
//! of listeners that observe the whole aggregate state.
//!
//! The registry reference-counts consumers: the first registration for a key tells the
//! orchestrator to consider loading, and removing the last one tells it to unload. It
//! never owns the aggregate state; it is handed a snapshot to notify with.

use crate::state::{AggregateState, LoaderState, ResourceKey};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

type StateCallback = dyn Fn(&LoaderState, &AggregateState) + Send + Sync;
type StateListener = dyn Fn(&AggregateState) + Send + Sync;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// A consumer callback for one resource instance.
///
/// Invoked with the instance's current state and the full aggregate state on every
/// change affecting the instance. Subscribers compare equal by identity, so keep the
/// same `Subscriber` (or a clone of it) to detach later.
#[derive(Clone)]
pub struct Subscriber {
    id: u64,
    callback: Arc<StateCallback>,
}

impl Subscriber {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&LoaderState, &AggregateState) + Send + Sync + 'static,
    {
        Self {
            id: NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
        }
    }

    /// A subscriber that only holds a reference count.
    pub fn noop() -> Self {
        Self::new(|_, _| {})
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Invokes the callback. A panicking callback is logged and otherwise ignored.
    pub fn deliver(&self, loader: &LoaderState, state: &AggregateState) {
        if catch_unwind(AssertUnwindSafe(|| (self.callback)(loader, state))).is_err() {
            warn!(subscriber = self.id, "Subscriber callback panicked");
        }
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// Identifies a registered whole-state listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A listener for every change to the aggregate state.
#[derive(Clone)]
pub struct StateListenerFn(Arc<StateListener>);

impl StateListenerFn {
    pub fn new<F>(listener: F) -> Self
    where
        F: Fn(&AggregateState) + Send + Sync + 'static,
    {
        Self(Arc::new(listener))
    }
}

impl fmt::Debug for StateListenerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateListenerFn")
    }
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    subscribers: HashMap<String, HashMap<String, Vec<Subscriber>>>,
    listeners: Vec<(ListenerId, StateListenerFn)>,
    next_listener: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `subscriber` for `key` and returns the new count. A count of 1 means this
    /// is the first consumer attached.
    pub fn register(&mut self, key: &ResourceKey, subscriber: Subscriber) -> usize {
        let list = self
            .subscribers
            .entry(key.resource_type.clone())
            .or_default()
            .entry(key.resource_id.clone())
            .or_default();
        list.push(subscriber);
        list.len()
    }

    /// Removes `subscriber` from `key` and returns the remaining count, or `None` when
    /// it was not registered there. Empty lists are dropped along with an emptied type.
    pub fn unregister(&mut self, key: &ResourceKey, subscriber: &Subscriber) -> Option<usize> {
        let ids = self.subscribers.get_mut(&key.resource_type)?;
        let list = ids.get_mut(&key.resource_id)?;
        let position = list.iter().position(|s| s == subscriber)?;
        list.remove(position);

        let remaining = list.len();
        if remaining == 0 {
            ids.remove(&key.resource_id);
            if ids.is_empty() {
                self.subscribers.remove(&key.resource_type);
            }
        }
        Some(remaining)
    }

    pub fn has_any(&self, key: &ResourceKey) -> bool {
        self.count(key) > 0
    }

    pub fn count(&self, key: &ResourceKey) -> usize {
        self.subscribers
            .get(&key.resource_type)
            .and_then(|ids| ids.get(&key.resource_id))
            .map_or(0, Vec::len)
    }

    pub fn add_listener(&mut self, listener: StateListenerFn) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Calls every subscriber of `key` in registration order, then every listener.
    pub fn notify(&self, state: &AggregateState, key: &ResourceKey) {
        if let Some(list) = self
            .subscribers
            .get(&key.resource_type)
            .and_then(|ids| ids.get(&key.resource_id))
        {
            let loader = state.loader_state(key);
            for subscriber in list {
                subscriber.deliver(&loader, state);
            }
        }
        self.notify_listeners(state);
    }

    /// Calls every whole-state listener.
    pub fn notify_listeners(&self, state: &AggregateState) {
        for (id, listener) in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| (listener.0)(state))).is_err() {
                warn!(listener = id.0, "State listener panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn key(id: &str) -> ResourceKey {
        ResourceKey::new("data", id)
    }

    #[test]
    fn test_register_counts_consumers() {
        let mut registry = SubscriptionRegistry::new();
        assert_eq!(registry.register(&key("1"), Subscriber::noop()), 1);
        assert_eq!(registry.register(&key("1"), Subscriber::noop()), 2);
        assert_eq!(registry.register(&key("2"), Subscriber::noop()), 1);
        assert_eq!(registry.count(&key("1")), 2);
    }

    #[test]
    fn test_unregister_last_consumer_cleans_up() {
        let mut registry = SubscriptionRegistry::new();
        let first = Subscriber::noop();
        let second = Subscriber::noop();
        registry.register(&key("1"), first.clone());
        registry.register(&key("1"), second.clone());

        assert_eq!(registry.unregister(&key("1"), &first), Some(1));
        assert!(registry.has_any(&key("1")));
        assert_eq!(registry.unregister(&key("1"), &second), Some(0));
        assert!(!registry.has_any(&key("1")));
        assert!(registry.subscribers.is_empty());
    }

    #[test]
    fn test_unregister_unknown_subscriber() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&key("1"), Subscriber::noop());
        assert_eq!(registry.unregister(&key("1"), &Subscriber::noop()), None);
        assert_eq!(registry.unregister(&key("2"), &Subscriber::noop()), None);
        assert_eq!(registry.count(&key("1")), 1);
    }

    #[test]
    fn test_notify_order_subscribers_then_listeners() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SubscriptionRegistry::new();

        for name in ["first", "second"] {
            let calls = calls.clone();
            registry.register(
                &key("1"),
                Subscriber::new(move |_, _| calls.lock().unwrap().push(name)),
            );
        }
        let listener_calls = calls.clone();
        registry.add_listener(StateListenerFn::new(move |_| {
            listener_calls.lock().unwrap().push("global")
        }));
        let other = calls.clone();
        registry.register(
            &key("2"),
            Subscriber::new(move |_, _| other.lock().unwrap().push("other-key")),
        );

        registry.notify(&AggregateState::new(), &key("1"));
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "global"]);
    }

    #[test]
    fn test_panicking_subscriber_does_not_stop_others() {
        let calls = Arc::new(Mutex::new(0));
        let mut registry = SubscriptionRegistry::new();
        registry.register(&key("1"), Subscriber::new(|_, _| panic!("consumer bug")));
        let counter = calls.clone();
        registry.register(
            &key("1"),
            Subscriber::new(move |_, _| *counter.lock().unwrap() += 1),
        );

        registry.notify(&AggregateState::new(), &key("1"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let mut registry = SubscriptionRegistry::new();
        let id = registry.add_listener(StateListenerFn::new(|_| {}));
        assert!(registry.remove_listener(id));
        assert!(!registry.remove_listener(id));
    }
}
