//! Flow-control composites: Sequence, Loop and Parallel.

pub mod looping;
pub mod parallel;
pub mod sequence;

pub use looping::Loop;
pub use parallel::{CompletionMode, Parallel, ParallelConfig, ABORT_BY_PARALLEL};
pub use sequence::{Sequence, SequenceConfig, ABORT_BY_SEQUENCE};

use std::sync::Arc;

use crate::component::node::Component;
use crate::core::errors::{FlowError, Result};

/// Shared setup routine for nested components.
///
/// For each child, in list order: link it to its parent, derive its id from
/// the parent's id and the list position, and copy the parent's hand-me-down
/// parameters unless the child carries its own value. Then every child is
/// prepared as an automated call; the first failure aborts the composite's
/// preparation without rolling back the side effects already applied.
pub(crate) async fn prepare_nested(
    children: &[Arc<dyn Component>],
    parent: &Arc<dyn Component>,
) -> Result<()> {
    let parent_node = parent.node();
    let parent_id = parent_node.id();
    let hand_me_downs = parent_node.hand_me_downs();

    for (index, child) in children.iter().enumerate() {
        let node = child.node();
        node.set_parent(Arc::downgrade(parent));

        let id = match &parent_id {
            Some(parent_id) => format!("{parent_id}_{index}"),
            None => index.to_string(),
        };
        node.assign_id(id);

        for key in &hand_me_downs {
            let inherited = parent_node.param(key);
            node.update_options(|options| options.inherit(key, inherited.as_ref()));
        }
    }

    let label = parent_node.label();
    futures::future::try_join_all(children.iter().map(|child| child.prepare(true)))
        .await
        .map_err(|source| FlowError::preparation(label, source))?;
    Ok(())
}

/// Mean progress across `children`; an empty composite reports 0.
pub(crate) fn mean_progress(children: &[Arc<dyn Component>]) -> f64 {
    if children.is_empty() {
        return 0.0;
    }
    children.iter().map(|child| child.progress()).sum::<f64>() / children.len() as f64
}
