//! Event subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use serde_json::Value;

/// Callback invoked with the raw event payload.
pub(crate) type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handlers grouped by event name, in registration order.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    handlers: DashMap<String, Vec<(u64, Handler)>>,
}

impl Registry {
    pub(crate) fn insert(&self, event: &str, handler: Handler) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    pub(crate) fn remove(&self, event: &str, id: u64) -> bool {
        let Some(mut entry) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|(handler_id, _)| *handler_id != id);
        let removed = entry.len() != before;
        let now_empty = entry.is_empty();
        drop(entry);
        if now_empty {
            self.handlers.remove_if(event, |_, handlers| handlers.is_empty());
        }
        removed
    }

    /// Run every handler for `event` to completion, returning how many ran.
    ///
    /// Handlers are cloned out first so they may subscribe or unsubscribe.
    pub(crate) fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let handlers: Vec<Handler> = self
            .handlers
            .get(event)
            .map(|entry| entry.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, |entry| entry.len())
    }
}

/// Guard for one registered handler.
///
/// The handler is removed when the guard is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Registry>,
    event: String,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<Registry>, event: String, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            event,
            id,
        }
    }

    /// The event this subscription listens to.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Remove the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.event, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}
