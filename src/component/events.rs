//! Lifecycle event system
//!
//! Every node carries its own bus: synchronous observer callbacks for
//! in-tree coordination, plus a broadcast channel backing `wait_for`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Buffered events per node; waiters that lag past this drop the oldest.
const EVENT_CAPACITY: usize = 64;

/// Lifecycle events emitted by a component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// Preparation finished; the component and all descendants are ready
    Prepare,
    /// The run phase started
    Run,
    /// A sequence advanced to the child at `position`
    Step { position: usize },
    /// The Done transition was taken
    End { reason: String },
    /// Teardown finished; fires exactly once, after `End`
    AfterEnd { reason: String },
}

impl LifecycleEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Prepare => EventKind::Prepare,
            Self::Run => EventKind::Run,
            Self::Step { .. } => EventKind::Step,
            Self::End { .. } => EventKind::End,
            Self::AfterEnd { .. } => EventKind::AfterEnd,
        }
    }
}

/// Discriminant used for subscriptions and `wait_for`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Prepare,
    Run,
    Step,
    End,
    AfterEnd,
}

/// Handle returned by [`EventBus::on`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Per-node event bus.
///
/// Observers registered through [`on`](EventBus::on) run synchronously on
/// the emitting task, in registration order. Async consumers subscribe a
/// broadcast receiver instead.
pub struct EventBus {
    tx: async_broadcast::Sender<LifecycleEvent>,
    // Keeps the channel open while no waiter holds a receiver.
    _idle: async_broadcast::InactiveReceiver<LifecycleEvent>,
    handlers: DashMap<u64, (EventKind, Handler)>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (mut tx, rx) = async_broadcast::broadcast(EVENT_CAPACITY);
        tx.set_overflow(true);
        Self {
            tx,
            _idle: rx.deactivate(),
            handlers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a synchronous observer for `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.insert(id, (kind, Arc::new(handler)));
        SubscriptionId(id)
    }

    /// Remove an observer. Returns false if it was already gone.
    pub fn off(&self, subscription: SubscriptionId) -> bool {
        self.handlers.remove(&subscription.0).is_some()
    }

    /// Invoke matching observers, then publish to async waiters.
    pub fn emit(&self, event: &LifecycleEvent) {
        let kind = event.kind();
        // Snapshot the matching handlers so callbacks may subscribe or
        // unsubscribe without holding map shards.
        let mut matching: Vec<(u64, Handler)> = self
            .handlers
            .iter()
            .filter(|entry| entry.value().0 == kind)
            .map(|entry| (*entry.key(), entry.value().1.clone()))
            .collect();
        matching.sort_by_key(|(id, _)| *id);
        for (_, handler) in matching {
            handler(event);
        }

        // Overflow mode keeps emission non-blocking; lagging waiters are
        // reported through RecvError::Overflowed on their side.
        let _ = self.tx.try_broadcast(event.clone());
    }

    /// New receiver observing every event emitted after this call.
    pub fn subscribe(&self) -> async_broadcast::Receiver<LifecycleEvent> {
        self.tx.new_receiver()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
