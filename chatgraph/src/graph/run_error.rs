//! Per-turn execution errors.

use thiserror::Error;

use crate::error::AgentError;

/// Failure of one `CompiledGraph::run`. Isolated to that turn; the caller
/// decides how to degrade (see `ChatEngine::run_turn`).
#[derive(Debug, Error)]
pub enum RunError {
    /// A routing function returned a name that is not among the node's declared targets.
    #[error("routing error: node '{from}' routed to '{target}', which is not a declared successor")]
    Routing { from: String, target: String },

    /// The run needed more node executions than `GraphConfig::max_steps`.
    #[error("step limit exceeded: graph did not finish within {max_steps} steps")]
    StepLimit { max_steps: usize },

    /// A node returned an error instead of encoding it into state.
    #[error("node '{node_id}' failed: {source}")]
    NodeFailed {
        node_id: String,
        #[source]
        source: AgentError,
    },

    /// The run's cancellation token fired.
    #[error("run cancelled")]
    Cancelled,
}
