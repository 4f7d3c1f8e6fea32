use serde::{Deserialize, Serialize};

/// Lifecycle state of a component.
///
/// States are ordered so callers can compare against [`Status::Done`] when
/// deciding whether a forced end is still required. Transitions are
/// monotonic: `Initialized → Prepared → Running → Done`, with forced abort
/// as the only way to truncate `Running` early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Initialized,
    Prepared,
    Running,
    Done,
}

impl Status {
    /// True once the terminal state is reached.
    pub fn is_done(self) -> bool {
        self == Status::Done
    }
}
