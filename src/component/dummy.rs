use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::component::node::{Component, Node};
use crate::component::options::Options;
use crate::core::errors::Result;

/// Smallest possible leaf: ends itself as soon as it runs.
///
/// Useful as a placeholder while authoring a tree, and as the canonical
/// instantly-completing child in tests.
pub struct Dummy {
    node: Node,
}

impl Dummy {
    pub fn new() -> Arc<Self> {
        Self::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let handle: Weak<dyn Component> = this.clone();
            Dummy {
                node: Node::new("dummy", options, handle),
            }
        })
    }
}

#[async_trait]
impl Component for Dummy {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_run(&self) -> Result<()> {
        self.end("dummy ended")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::status::Status;

    #[tokio::test]
    async fn test_dummy_ends_itself() {
        let dummy = Dummy::new();
        dummy.prepare(false).await.unwrap();
        dummy.run().await.unwrap();
        assert_eq!(dummy.status(), Status::Done);
        assert_eq!(dummy.node().end_reason().as_deref(), Some("dummy ended"));
        assert_eq!(dummy.progress(), 1.0);
    }
}
