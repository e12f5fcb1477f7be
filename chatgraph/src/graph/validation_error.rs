//! Build-time graph validation errors.
//!
//! Returned by `StateGraph::compile`; a graph that fails validation never runs.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    /// No start node was declared (`add_edge(START, ..)` or `set_entry_point`).
    #[error("graph has no start node")]
    MissingStart,

    /// The declared start node was never added with `add_node`.
    #[error("start node not declared: {0}")]
    StartNotDeclared(String),

    /// `add_node` was called twice with the same id.
    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    /// An edge references a node that was never added (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node was given more than one successor rule.
    #[error("node '{0}' already has a successor")]
    DuplicateSuccessor(String),

    /// A conditional edge declares no targets.
    #[error("conditional edge from '{0}' has no targets")]
    EmptyRouteTargets(String),

    /// A cycle in which no node can set `turn_complete`; it would never stop.
    #[error("cycle without a turn-completing node: {}", .0.join(" -> "))]
    UnguardedCycle(Vec<String>),

    /// A node that emits tool calls cannot reach a tool-resolving node.
    #[error("node '{0}' emits tool calls but no tool-resolving node is reachable from it")]
    UnresolvedToolCalls(String),
}
