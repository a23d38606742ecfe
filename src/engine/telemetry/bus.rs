use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use super::event::TelemetryEvent;

const LOG_TARGET: &str = "engine::telemetry::bus";

/// Handlers run synchronously on the publishing task and must not block.
pub type TelemetryHandler = Arc<dyn Fn(&TelemetryEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    names: HashSet<String>,
    handler: TelemetryHandler,
}

/// In-process publish/subscribe channel for named events.
#[derive(Clone, Default)]
pub struct TelemetryBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<I, S>(&self, names: I, handler: TelemetryHandler) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let names: HashSet<String> = names.into_iter().map(Into::into).collect();
        debug!(target: LOG_TARGET, subscription = id.0, events = names.len(), "Handler attached");
        self.inner
            .subscriptions
            .write()
            .insert(id, Subscription { names, handler });
        id
    }

    /// Returns false when the id was never registered or already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.inner.subscriptions.write().remove(&id).is_some();
        if removed {
            debug!(target: LOG_TARGET, subscription = id.0, "Handler detached");
        }
        removed
    }

    pub fn publish(&self, event: TelemetryEvent) {
        // Clone matching handlers out so a handler may (un)subscribe without deadlocking.
        let handlers: Vec<TelemetryHandler> = self
            .inner
            .subscriptions
            .read()
            .values()
            .filter(|s| s.names.contains(&event.name))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }
}

impl std::fmt::Debug for TelemetryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryBus")
            .field("handlers", &self.handler_count())
            .finish()
    }
}
