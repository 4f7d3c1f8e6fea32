//! Serial composite: runs an ordered list of children one at a time.

use std::sync::{Arc, Mutex, RwLock, Weak};

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::component::events::LifecycleEvent;
use crate::component::node::{Component, Node};
use crate::component::options::Options;
use crate::component::status::Status;
use crate::core::errors::{FlowError, Result};
use crate::core::rng::ShuffleRng;
use crate::flow::{mean_progress, prepare_nested};

/// Reason handed to a child that is cut short by its sequence.
pub const ABORT_BY_SEQUENCE: &str = "abort by sequence";

/// Reason recorded when the content is exhausted naturally.
const END_OF_CONTENT: &str = "end of content";

/// Configuration for a [`Sequence`].
#[derive(Debug, Clone, Default)]
pub struct SequenceConfig {
    pub options: Options,
    /// Permute the content once, at preparation time.
    pub shuffle: bool,
    /// Seed for the shuffle source; OS entropy when absent.
    pub seed: Option<u64>,
}

struct Internals {
    /// Iteration cursor, created once at preparation. Never restarts.
    cursor: Option<usize>,
    /// Position and handle of the child currently underway.
    current: Option<(usize, Arc<dyn Component>)>,
}

/// Ordered composite.
///
/// Children run strictly one at a time: the next child starts only once its
/// predecessor reaches Done. Ending the sequence mid-child aborts the
/// current child and suppresses any further stepping.
pub struct Sequence {
    node: Node,
    content: RwLock<Vec<Arc<dyn Component>>>,
    shuffle: bool,
    rng: Mutex<ShuffleRng>,
    internals: Mutex<Internals>,
}

impl Sequence {
    pub fn new(content: Vec<Arc<dyn Component>>) -> Arc<Self> {
        Self::with_config(content, SequenceConfig::default())
    }

    pub fn with_config(content: Vec<Arc<dyn Component>>, config: SequenceConfig) -> Arc<Self> {
        Self::with_kind("sequence", content, config)
    }

    pub(crate) fn with_kind(
        kind: &'static str,
        content: Vec<Arc<dyn Component>>,
        config: SequenceConfig,
    ) -> Arc<Self> {
        let rng = config.seed.map(ShuffleRng::seeded).unwrap_or_default();
        Arc::new_cyclic(|this: &Weak<Self>| {
            let handle: Weak<dyn Component> = this.clone();
            Sequence {
                node: Node::new(kind, config.options, handle),
                content: RwLock::new(content),
                shuffle: config.shuffle,
                rng: Mutex::new(rng),
                internals: Mutex::new(Internals {
                    cursor: None,
                    current: None,
                }),
            }
        })
    }

    /// Children in run order (shuffled order once prepared).
    pub fn content(&self) -> Vec<Arc<dyn Component>> {
        self.content.read().expect("content lock poisoned").clone()
    }

    /// Position and handle of the child currently underway.
    pub fn current(&self) -> Option<(usize, Arc<dyn Component>)> {
        self.internals
            .lock()
            .expect("internals lock poisoned")
            .current
            .clone()
    }

    /// Advance to the next child.
    ///
    /// Returns the freshly-current `(position, child)` pair, or `None` once
    /// the content is exhausted, in which case the sequence has taken its
    /// Done transition. Stepping a Done sequence is a protocol error with no
    /// side effects.
    pub fn step(&self) -> Result<Option<(usize, Arc<dyn Component>)>> {
        if self.node.status() == Status::Done {
            return Err(FlowError::protocol(
                self.node.label(),
                "sequence ended, cannot take any more steps",
            ));
        }

        let next = {
            let mut internals = self.internals.lock().expect("internals lock poisoned");
            let cursor = internals.cursor.as_mut().ok_or_else(|| {
                FlowError::protocol(self.node.label(), "cannot step before preparation")
            })?;
            let content = self.content.read().expect("content lock poisoned");
            if *cursor >= content.len() {
                internals.current = None;
                None
            } else {
                let position = *cursor;
                let child = content[position].clone();
                *cursor += 1;
                internals.current = Some((position, child.clone()));
                Some((position, child))
            }
        };

        match next {
            None => {
                self.end(END_OF_CONTENT)?;
                Ok(None)
            }
            Some((position, child)) => {
                trace!(id = ?self.node.id(), position, "sequence step");
                self.node.events().emit(&LifecycleEvent::Step { position });
                Ok(Some((position, child)))
            }
        }
    }
}

#[async_trait]
impl Component for Sequence {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_prepare(&self) -> Result<()> {
        if self.shuffle {
            let mut content = self.content.write().expect("content lock poisoned");
            self.rng
                .lock()
                .expect("rng lock poisoned")
                .shuffle(&mut content);
        }

        self.internals
            .lock()
            .expect("internals lock poisoned")
            .cursor = Some(0);

        let children = self.content();
        let this = self.node.handle()?;
        prepare_nested(&children, &this).await
    }

    async fn on_run(&self) -> Result<()> {
        loop {
            let Some((_, child)) = self.step()? else {
                // Exhausted; step already took the Done transition.
                return Ok(());
            };
            child.run().await?;
            // A forced end may land while the child is underway. The
            // teardown has already aborted the child, and stepping again
            // would violate the protocol.
            if self.node.status() == Status::Done {
                return Ok(());
            }
        }
    }

    fn on_end(&self, _reason: &str) {
        let current = self
            .internals
            .lock()
            .expect("internals lock poisoned")
            .current
            .clone();
        if let Some((position, child)) = current {
            if child.node().status() < Status::Done {
                debug!(id = ?self.node.id(), position, "aborting current child");
                if let Err(error) = child.end(ABORT_BY_SEQUENCE) {
                    warn!(id = ?self.node.id(), %error, "failed to abort current child");
                }
            }
        }
    }

    fn progress(&self) -> f64 {
        mean_progress(&self.content())
    }
}
