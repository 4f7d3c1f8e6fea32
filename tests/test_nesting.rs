//! Cross-level behavior: id propagation, hand-me-downs, loops, failures.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use trialflow::{
    Component, Dummy, EventKind, FlowError, Loop, Node, Options, Parallel, Sequence,
    SequenceConfig, Status,
};

/// Leaf that records its tag when run, then ends itself.
struct Probe {
    node: Node,
    log: Arc<Mutex<Vec<String>>>,
    tag: String,
}

impl Probe {
    fn new(tag: String, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        let log = log.clone();
        Arc::new_cyclic(|this: &Weak<Self>| {
            let handle: Weak<dyn Component> = this.clone();
            Probe {
                node: Node::new("probe", Options::default(), handle),
                log,
                tag,
            }
        })
    }
}

#[async_trait]
impl Component for Probe {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_run(&self) -> trialflow::Result<()> {
        self.log.lock().unwrap().push(self.tag.clone());
        self.end("probe ended")
    }
}

/// Leaf whose preparation fails.
struct FailingPrep {
    node: Node,
}

impl FailingPrep {
    fn new() -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let handle: Weak<dyn Component> = this.clone();
            FailingPrep {
                node: Node::new("failing", Options::default(), handle),
            }
        })
    }
}

#[async_trait]
impl Component for FailingPrep {
    fn node(&self) -> &Node {
        &self.node
    }

    async fn on_prepare(&self) -> trialflow::Result<()> {
        Err(FlowError::configuration_field("media manifest missing", "media"))
    }

    async fn on_run(&self) -> trialflow::Result<()> {
        unreachable!("a component that failed to prepare never runs")
    }
}

#[tokio::test]
async fn test_ids_propagate_through_the_tree() -> Result<()> {
    let grandchildren: Vec<Arc<dyn Component>> = vec![Dummy::new() as _, Dummy::new() as _];
    let inner = Sequence::new(grandchildren);
    let content: Vec<Arc<dyn Component>> = vec![inner.clone() as _, Dummy::new() as _];
    let root = Sequence::with_config(
        content,
        SequenceConfig {
            options: Options::with_id("p"),
            ..Default::default()
        },
    );

    root.prepare(false).await?;

    assert_eq!(root.node().id().as_deref(), Some("p"));
    assert_eq!(inner.node().id().as_deref(), Some("p_0"));
    let grandchild_ids: Vec<_> = inner
        .content()
        .iter()
        .map(|c| c.node().id().unwrap())
        .collect();
    assert_eq!(grandchild_ids, vec!["p_0_0", "p_0_1"]);
    assert_eq!(root.content()[1].node().id().as_deref(), Some("p_1"));
    Ok(())
}

#[tokio::test]
async fn test_hand_me_down_fills_only_vacant_values() -> Result<()> {
    let inheriting = Dummy::new();
    let explicit = {
        let mut options = Options::default();
        options.set_param("layout", "rows");
        Dummy::with_options(options)
    };

    let mut options = Options::with_id("p");
    options.hand_me_downs = vec!["layout".to_string()];
    options.set_param("layout", "grid");
    let content: Vec<Arc<dyn Component>> = vec![inheriting.clone() as _, explicit.clone() as _];
    let sequence = Sequence::with_config(
        content,
        SequenceConfig {
            options,
            ..Default::default()
        },
    );

    sequence.prepare(false).await?;

    assert_eq!(inheriting.node().param("layout"), Some(json!("grid")));
    assert_eq!(explicit.node().param("layout"), Some(json!("rows")));
    Ok(())
}

#[tokio::test]
async fn test_default_hand_me_downs_flow_transitively() -> Result<()> {
    let grandchild = Dummy::new();
    let inner = Sequence::new(vec![grandchild.clone() as Arc<dyn Component>]);

    let mut options = Options::default();
    options.set_param("debug", true);
    let root = Sequence::with_config(
        vec![inner.clone() as Arc<dyn Component>],
        SequenceConfig {
            options,
            ..Default::default()
        },
    );

    root.prepare(false).await?;

    // "debug" is in the default hand-me-down set at every level, so the
    // value travels from the root to the grandchild.
    assert_eq!(inner.node().param("debug"), Some(json!(true)));
    assert_eq!(grandchild.node().param("debug"), Some(json!(true)));
    Ok(())
}

#[tokio::test]
async fn test_parent_links_are_set_during_preparation() {
    let child = Dummy::new();
    let sequence = Sequence::with_config(
        vec![child.clone() as Arc<dyn Component>],
        SequenceConfig {
            options: Options::with_id("root"),
            ..Default::default()
        },
    );

    assert!(child.node().parent().is_none());
    sequence.prepare(false).await.unwrap();

    let parent = child.node().parent().expect("parent link set");
    assert_eq!(parent.node().id().as_deref(), Some("root"));
}

#[tokio::test]
async fn test_loop_maps_parameters_in_collection_order() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let looped = Loop::new(["left", "center", "right"], |side| {
        Probe::new(format!("trial:{side}"), &log) as Arc<dyn Component>
    });

    looped.prepare(false).await?;
    looped.run().await?;

    assert_eq!(
        *log.lock().unwrap(),
        vec!["trial:left", "trial:center", "trial:right"]
    );
    assert_eq!(looped.status(), Status::Done);
    Ok(())
}

#[tokio::test]
async fn test_failed_child_preparation_aborts_the_composite() {
    let failing = FailingPrep::new();
    let sibling = Dummy::new();
    let content: Vec<Arc<dyn Component>> = vec![failing.clone() as _, sibling.clone() as _];
    let sequence = Sequence::new(content);

    let error = sequence
        .prepare(false)
        .await
        .expect_err("child preparation failure propagates");
    assert_eq!(error.category(), "preparation");

    // Side effects applied before the failure stick around.
    assert_eq!(failing.node().id().as_deref(), Some("0"));
    assert_eq!(sibling.node().id().as_deref(), Some("1"));

    // The composite never became runnable.
    assert_eq!(sequence.status(), Status::Initialized);
    let error = sequence.run().await.expect_err("unprepared composite");
    assert!(matches!(error, FlowError::Protocol { .. }));
}

#[tokio::test]
async fn test_wait_for_resolves_immediately_after_done() -> Result<()> {
    let parallel = Parallel::new(vec![Dummy::new() as Arc<dyn Component>]);
    parallel.prepare(false).await?;
    parallel.run().await?;

    let event = tokio::time::timeout(
        Duration::from_secs(1),
        parallel.wait_for(EventKind::AfterEnd),
    )
    .await??;
    assert_eq!(event.kind(), EventKind::AfterEnd);
    Ok(())
}

#[tokio::test]
async fn test_progress_aggregates_across_levels() {
    struct FixedProgress {
        node: Node,
        value: f64,
    }

    impl FixedProgress {
        fn new(value: f64) -> Arc<Self> {
            Arc::new_cyclic(|this: &Weak<Self>| {
                let handle: Weak<dyn Component> = this.clone();
                FixedProgress {
                    node: Node::new("fixed", Options::default(), handle),
                    value,
                }
            })
        }
    }

    #[async_trait]
    impl Component for FixedProgress {
        fn node(&self) -> &Node {
            &self.node
        }

        fn progress(&self) -> f64 {
            self.value
        }
    }

    let inner_content: Vec<Arc<dyn Component>> =
        vec![FixedProgress::new(0.2) as _, FixedProgress::new(0.4) as _];
    let inner = Sequence::new(inner_content);
    let content: Vec<Arc<dyn Component>> = vec![inner as _, FixedProgress::new(0.9) as _];
    let root = Sequence::new(content);

    assert!((root.progress() - 0.6).abs() < 1e-9);
}
