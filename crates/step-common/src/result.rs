// Build outcome lattice and the per-invocation result record.

use serde::{Deserialize, Serialize};

/// The coarse outcome the surrounding pipeline understands.
///
/// Ordered `Success < Failure`; merging takes the maximum, so a build that
/// has failed can never be flipped back to success by a later step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildResult {
    Success,
    Failure,
}

impl BuildResult {
    /// Derive the outcome from a process exit code.
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            BuildResult::Success
        } else {
            BuildResult::Failure
        }
    }

    /// Monotonic merge over the outcome lattice: failure is absorbing.
    pub fn merge(current: Option<BuildResult>, incoming: BuildResult) -> BuildResult {
        match current {
            None => incoming,
            Some(existing) => existing.max(incoming),
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildResult::Success => write!(f, "SUCCESS"),
            BuildResult::Failure => write!(f, "FAILURE"),
        }
    }
}

/// What one invocation produced: the exit code when a process actually
/// ran, the derived outcome, and launch-level failure detail when the
/// process never started.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub exit_code: Option<i32>,
    pub outcome: BuildResult,
    pub launch_failure: Option<String>,
}

impl InvocationResult {
    /// A completed process with the given exit code.
    pub fn from_exit_code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            outcome: BuildResult::from_exit_code(code),
            launch_failure: None,
        }
    }

    /// A launch-level failure; no exit code exists.
    pub fn launch_failure(detail: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            outcome: BuildResult::Failure,
            launch_failure: Some(detail.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == BuildResult::Success
    }
}
