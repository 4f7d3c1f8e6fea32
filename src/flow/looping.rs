//! Loop: a sequence whose children come from a factory.

use std::sync::Arc;

use async_trait::async_trait;

use crate::component::node::{Component, Node};
use crate::core::errors::Result;
use crate::flow::sequence::{Sequence, SequenceConfig};

/// A [`Sequence`] whose content is generated by mapping a component factory
/// over a parameter collection, one child per entry, in collection order.
///
/// Stepping, shuffling, hand-me-downs and progress are all inherited from
/// the inner sequence it delegates to.
pub struct Loop {
    sequence: Arc<Sequence>,
}

impl Loop {
    pub fn new<P, F>(parameters: impl IntoIterator<Item = P>, factory: F) -> Arc<Self>
    where
        F: FnMut(P) -> Arc<dyn Component>,
    {
        Self::with_config(parameters, factory, SequenceConfig::default())
    }

    pub fn with_config<P, F>(
        parameters: impl IntoIterator<Item = P>,
        mut factory: F,
        config: SequenceConfig,
    ) -> Arc<Self>
    where
        F: FnMut(P) -> Arc<dyn Component>,
    {
        let content: Vec<Arc<dyn Component>> = parameters
            .into_iter()
            .map(|parameter| factory(parameter))
            .collect();
        Arc::new(Loop {
            sequence: Sequence::with_kind("loop", content, config),
        })
    }

    /// The sequence driving this loop, for stepping and content access.
    pub fn as_sequence(&self) -> &Sequence {
        &self.sequence
    }
}

#[async_trait]
impl Component for Loop {
    fn node(&self) -> &Node {
        self.sequence.node()
    }

    async fn on_prepare(&self) -> Result<()> {
        self.sequence.on_prepare().await
    }

    async fn on_run(&self) -> Result<()> {
        self.sequence.on_run().await
    }

    fn on_end(&self, reason: &str) {
        self.sequence.on_end(reason);
    }

    fn progress(&self) -> f64 {
        self.sequence.progress()
    }
}
