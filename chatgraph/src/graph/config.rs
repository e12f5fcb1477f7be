//! Executor configuration.

/// Default maximum number of node executions per turn.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Per-graph execution limits, fixed at compile time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphConfig {
    /// A run that needs more node executions than this fails with `RunError::StepLimit`.
    pub max_steps: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl GraphConfig {
    pub fn with_max_steps(max_steps: usize) -> Self {
        Self { max_steps }
    }
}
