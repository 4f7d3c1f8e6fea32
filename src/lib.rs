//! trialflow - hierarchical orchestration of timed presentation components.
//!
//! Experiments and other interactive, timed presentations are trees of
//! components with a `prepare`/`run`/`end` lifecycle. This library provides
//! the composites that sequence and parallelize such trees:
//!
//! - [`Sequence`] runs an ordered (optionally shuffled) list of children one
//!   at a time.
//! - [`Loop`] builds a sequence by mapping a component factory over a
//!   parameter collection.
//! - [`Parallel`] runs children concurrently, ending under a race or all
//!   completion policy.
//!
//! Composites are themselves [`Component`]s, so trees nest to arbitrary
//! depth. Preparation propagates ids and hand-me-down parameters downward;
//! cancellation propagates top-down as a forced end with a reason.
//!
//! ```no_run
//! use std::sync::Arc;
//! use trialflow::{Component, Dummy, Sequence};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> trialflow::Result<()> {
//!     let content: Vec<Arc<dyn Component>> = vec![Dummy::new(), Dummy::new()];
//!     let trial = Sequence::new(content);
//!     trial.prepare(false).await?;
//!     trial.run().await?;
//!     Ok(())
//! }
//! ```

// Core infrastructure modules
pub mod core {
    pub mod errors;
    pub mod logging;
    pub mod rng;
}

// Component contract and flow-control composites
pub mod component;
pub mod flow;

// Re-exports for convenience
pub use crate::core::errors::{FlowError, Result};
pub use crate::core::rng::ShuffleRng;
pub use component::{
    Component, Dummy, EventBus, EventKind, LifecycleEvent, Node, Options, Status, SubscriptionId,
    DEFAULT_HAND_ME_DOWNS,
};
pub use flow::{
    CompletionMode, Loop, Parallel, ParallelConfig, Sequence, SequenceConfig, ABORT_BY_PARALLEL,
    ABORT_BY_SEQUENCE,
};
