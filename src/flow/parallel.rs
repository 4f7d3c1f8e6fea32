//! Concurrent composite: runs all children simultaneously.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::component::events::EventKind;
use crate::component::node::{Component, Node};
use crate::component::options::Options;
use crate::component::status::Status;
use crate::core::errors::Result;
use crate::flow::{mean_progress, prepare_nested};

/// Reason handed to children cut short by their parallel composite.
pub const ABORT_BY_PARALLEL: &str = "abort by parallel";

const RACE_SETTLED: &str = "race settled";
const ALL_DONE: &str = "all components done";

/// Completion policy for a [`Parallel`] composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionMode {
    /// End as soon as any child reaches Done.
    #[default]
    Race,
    /// End once every child has reached Done.
    All,
}

/// Configuration for a [`Parallel`].
#[derive(Debug, Clone, Default)]
pub struct ParallelConfig {
    pub options: Options,
    pub mode: CompletionMode,
}

/// Unordered composite.
///
/// Every child's run starts concurrently; no child may assume relative
/// ordering. The composite takes its Done transition when the completion
/// policy is satisfied, force-ending whichever children are still underway,
/// but its own run resolves only once every child's run has resolved.
pub struct Parallel {
    node: Node,
    content: Vec<Arc<dyn Component>>,
    mode: CompletionMode,
}

impl Parallel {
    pub fn new(content: Vec<Arc<dyn Component>>) -> Arc<Self> {
        Self::with_config(content, ParallelConfig::default())
    }

    pub fn with_config(content: Vec<Arc<dyn Component>>, config: ParallelConfig) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let handle: Weak<dyn Component> = this.clone();
            Parallel {
                node: Node::new("parallel", config.options, handle),
                content,
                mode: config.mode,
            }
        })
    }

    pub fn content(&self) -> &[Arc<dyn Component>] {
        &self.content
    }

    pub fn mode(&self) -> CompletionMode {
        self.mode
    }
}

fn completion_reason(mode: CompletionMode) -> &'static str {
    match mode {
        CompletionMode::Race => RACE_SETTLED,
        CompletionMode::All => ALL_DONE,
    }
}

/// Owned wait on a child's terminal event, usable in select/join sets.
async fn wait_until_done(child: Arc<dyn Component>) {
    let _ = child.wait_for(EventKind::AfterEnd).await;
}

#[async_trait]
impl Component for Parallel {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_prepare(&self) -> Result<()> {
        let this = self.node.handle()?;
        prepare_nested(&self.content, &this).await
    }

    async fn on_run(&self) -> Result<()> {
        if self.content.is_empty() {
            self.end(completion_reason(self.mode))?;
            return Ok(());
        }

        // The policy resolves when the configured completion condition is
        // met, which may be well before the children's run futures have
        // drained.
        let mode = self.mode;
        let policy = {
            let children = self.content.clone();
            async move {
                let waits: Vec<_> = children
                    .into_iter()
                    .map(|child| Box::pin(wait_until_done(child)))
                    .collect();
                match mode {
                    CompletionMode::Race => {
                        let _ = futures::future::select_all(waits).await;
                    }
                    CompletionMode::All => {
                        futures::future::join_all(waits).await;
                    }
                }
            }
        };

        let runs = futures::future::try_join_all(self.content.iter().map(|child| child.run()));
        tokio::pin!(runs);
        tokio::pin!(policy);

        tokio::select! {
            result = &mut runs => {
                result?;
                if self.node.status() < Status::Done {
                    self.end(completion_reason(mode))?;
                }
            }
            _ = &mut policy => {
                if self.node.status() < Status::Done {
                    self.end(completion_reason(mode))?;
                }
                // Losing children are still draining toward cancellation.
                runs.await?;
            }
        }
        Ok(())
    }

    fn on_end(&self, _reason: &str) {
        for child in &self.content {
            if child.node().status() < Status::Done {
                debug!(id = ?self.node.id(), child = ?child.node().id(), "aborting child");
                if let Err(error) = child.end(ABORT_BY_PARALLEL) {
                    warn!(id = ?self.node.id(), %error, "failed to abort child");
                }
            }
        }
    }

    fn progress(&self) -> f64 {
        mean_progress(&self.content)
    }
}
