//! Component contract and shared state core.
//!
//! Composites and leaves alike embed a [`Node`] and implement [`Component`];
//! the provided trait methods drive the status machine so implementors only
//! supply the phase hooks.

use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::component::events::{EventBus, EventKind, LifecycleEvent, SubscriptionId};
use crate::component::options::Options;
use crate::component::status::Status;
use crate::core::errors::{FlowError, Result};

/// State core embedded in every component.
///
/// Holds identity, status, the parent back-reference, options and the event
/// bus. All cross-component mutation flows through here: the preparation
/// protocol assigns ids and copies hand-me-downs, and a parent's forced end
/// reaches children through their [`Component::end`].
pub struct Node {
    kind: &'static str,
    /// Non-owning handle to the component this node is embedded in.
    this: Weak<dyn Component>,
    status: RwLock<Status>,
    options: RwLock<Options>,
    parent: RwLock<Option<Weak<dyn Component>>>,
    end_reason: RwLock<Option<String>>,
    events: EventBus,
}

impl Node {
    /// State core for a new component of flavor `kind`.
    ///
    /// `this` is a non-owning handle back to the embedding component,
    /// normally produced inside [`Arc::new_cyclic`]:
    ///
    /// ```ignore
    /// Arc::new_cyclic(|this: &Weak<Self>| {
    ///     let handle: Weak<dyn Component> = this.clone();
    ///     Self { node: Node::new("fixation", options, handle) }
    /// })
    /// ```
    pub fn new(kind: &'static str, options: Options, this: Weak<dyn Component>) -> Self {
        Self {
            kind,
            this,
            status: RwLock::new(Status::Initialized),
            options: RwLock::new(options),
            parent: RwLock::new(None),
            end_reason: RwLock::new(None),
            events: EventBus::new(),
        }
    }

    /// Component flavor, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn status(&self) -> Status {
        *self.status.read().expect("status lock poisoned")
    }

    /// Path-style identifier, absent until the enclosing composite prepares
    /// this component (root components keep their constructed id).
    pub fn id(&self) -> Option<String> {
        self.options.read().expect("options lock poisoned").id.clone()
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> Options {
        self.options.read().expect("options lock poisoned").clone()
    }

    /// Mutable access to the options.
    pub fn update_options<F: FnOnce(&mut Options)>(&self, f: F) {
        f(&mut self.options.write().expect("options lock poisoned"));
    }

    pub fn param(&self, key: &str) -> Option<Value> {
        self.options
            .read()
            .expect("options lock poisoned")
            .param(key)
            .cloned()
    }

    pub fn set_param<V: Into<Value>>(&self, key: &str, value: V) {
        self.update_options(|options| {
            options.set_param(key, value);
        });
    }

    pub fn hand_me_downs(&self) -> Vec<String> {
        self.options
            .read()
            .expect("options lock poisoned")
            .hand_me_downs
            .clone()
    }

    /// The owning composite, while it is alive.
    pub fn parent(&self) -> Option<Arc<dyn Component>> {
        self.parent
            .read()
            .expect("parent lock poisoned")
            .as_ref()
            .and_then(Weak::upgrade)
    }

    pub(crate) fn set_parent(&self, parent: Weak<dyn Component>) {
        *self.parent.write().expect("parent lock poisoned") = Some(parent);
    }

    /// Assign the id derived from the parent's id and list position.
    /// Preparation runs once per component, so this never re-fires.
    pub(crate) fn assign_id(&self, id: String) {
        self.options.write().expect("options lock poisoned").id = Some(id);
    }

    /// The reason recorded by the Done transition.
    pub fn end_reason(&self) -> Option<String> {
        self.end_reason
            .read()
            .expect("end reason lock poisoned")
            .clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a synchronous observer for `kind`.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    /// Remove a previously registered observer.
    pub fn off(&self, subscription: SubscriptionId) -> bool {
        self.events.off(subscription)
    }

    /// Shared handle to the component embedding this node.
    pub fn handle(&self) -> Result<Arc<dyn Component>> {
        self.this
            .upgrade()
            .ok_or_else(|| FlowError::internal("component handle used after drop"))
    }

    /// "kind 'id'" label for errors and logs.
    pub fn label(&self) -> String {
        match self.id() {
            Some(id) => format!("{} '{}'", self.kind, id),
            None => self.kind.to_string(),
        }
    }

    fn display_id(&self) -> String {
        self.id().unwrap_or_else(|| "-".to_string())
    }

    /// Take a forward transition, failing on anything but `from`.
    pub(crate) fn transition(&self, from: Status, to: Status) -> Result<()> {
        let mut status = self.status.write().expect("status lock poisoned");
        if *status != from {
            return Err(FlowError::protocol(
                self.label(),
                format!("cannot move from {:?} to {:?}", *status, to),
            ));
        }
        *status = to;
        Ok(())
    }

    /// Take the Done transition, recording `reason`.
    ///
    /// Guards the double-end invariant: a component is never ended twice,
    /// and never before it was prepared.
    fn begin_end(&self, reason: &str) -> Result<()> {
        let mut status = self.status.write().expect("status lock poisoned");
        match *status {
            Status::Done => Err(FlowError::protocol(self.label(), "component already ended")),
            Status::Initialized => Err(FlowError::protocol(
                self.label(),
                "cannot end a component that was never prepared",
            )),
            Status::Prepared | Status::Running => {
                *status = Status::Done;
                *self.end_reason.write().expect("end reason lock poisoned") =
                    Some(reason.to_string());
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("kind", &self.node().kind())
            .field("status", &self.node().status())
            .finish()
    }
}

/// The lifecycle contract shared by leaves and composites.
///
/// Sequence, Loop and Parallel implement this trait themselves, so composites
/// nest to arbitrary depth. Implementors supply the phase hooks; the provided
/// methods own the status machine and event emission.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Shared state core.
    fn node(&self) -> &Node;

    /// Phase hook: component-specific preparation. Composites shuffle,
    /// create iterators and prepare their children here.
    async fn on_prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Phase hook: the component's running behavior.
    ///
    /// The default runs until the component is ended from outside, which is
    /// the natural behavior for presentation leaves awaiting a response or
    /// timeout managed elsewhere.
    async fn on_run(&self) -> Result<()> {
        self.wait_for(EventKind::AfterEnd).await?;
        Ok(())
    }

    /// Phase hook: synchronous teardown on the Done transition. Composites
    /// cancel their not-yet-done children here.
    fn on_end(&self, _reason: &str) {}

    /// Progress in `[0, 1]`. Leaves report 0 until Done; composites average
    /// their children.
    fn progress(&self) -> f64 {
        if self.node().status() == Status::Done {
            1.0
        } else {
            0.0
        }
    }

    /// Current lifecycle state.
    fn status(&self) -> Status {
        self.node().status()
    }

    /// Prepare this component and, recursively, every descendant.
    ///
    /// `automated` marks calls issued by an enclosing composite rather than
    /// directly by the user. Resolves once the whole subtree is ready; a
    /// failing descendant aborts the preparation.
    async fn prepare(&self, automated: bool) -> Result<()> {
        let node = self.node();
        if node.status() != Status::Initialized {
            return Err(FlowError::protocol(
                node.label(),
                "prepare on a component that is not initialized",
            ));
        }
        debug!(
            kind = node.kind(),
            id = %node.display_id(),
            automated,
            "preparing component"
        );
        self.on_prepare().await?;
        node.transition(Status::Initialized, Status::Prepared)?;
        node.events().emit(&LifecycleEvent::Prepare);
        Ok(())
    }

    /// Run to completion.
    ///
    /// Resolves once this component, and for composites every descendant's
    /// run, has finished. A forced end resolves it early; a descendant
    /// failure rejects it without a Done transition.
    async fn run(&self) -> Result<()> {
        let node = self.node();
        node.transition(Status::Prepared, Status::Running)?;
        debug!(kind = node.kind(), id = %node.display_id(), "running component");
        node.events().emit(&LifecycleEvent::Run);
        self.on_run().await
    }

    /// Take the Done transition with `reason`, forcing it if the component
    /// is still underway.
    ///
    /// Ending an already-Done component is a protocol error; callers racing
    /// a natural completion must check [`status`](Component::status) first,
    /// as the composites' own teardown loops do.
    fn end(&self, reason: &str) -> Result<()> {
        let node = self.node();
        node.begin_end(reason)?;
        debug!(
            kind = node.kind(),
            id = %node.display_id(),
            reason,
            "component ended"
        );
        node.events().emit(&LifecycleEvent::End {
            reason: reason.to_string(),
        });
        self.on_end(reason);
        node.events().emit(&LifecycleEvent::AfterEnd {
            reason: reason.to_string(),
        });
        Ok(())
    }

    /// Resolve on the next occurrence of `kind`.
    ///
    /// Waiting for `AfterEnd` on an already-Done component resolves
    /// immediately, so late subscribers cannot miss the terminal event.
    async fn wait_for(&self, kind: EventKind) -> Result<LifecycleEvent> {
        let node = self.node();
        let mut rx = node.events().subscribe();
        loop {
            if kind == EventKind::AfterEnd && node.status() == Status::Done {
                let reason = node.end_reason().unwrap_or_default();
                return Ok(LifecycleEvent::AfterEnd { reason });
            }
            match rx.recv().await {
                Ok(event) if event.kind() == kind => return Ok(event),
                Ok(_) => continue,
                Err(async_broadcast::RecvError::Overflowed(missed)) => {
                    warn!(
                        kind = node.kind(),
                        id = %node.display_id(),
                        missed,
                        "event waiter lagged"
                    );
                    continue;
                }
                Err(async_broadcast::RecvError::Closed) => {
                    return Err(FlowError::internal("event channel closed while waiting"));
                }
            }
        }
    }
}
