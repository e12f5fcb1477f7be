//! Conversation graph: nodes, static and conditional edges, build-time
//! validation and the per-turn executor.
//!
//! Build with [`StateGraph`] (`add_node`, `add_edge` with [`START`]/[`END`],
//! `add_conditional_edges`), then `compile` into an immutable [`CompiledGraph`]
//! and `run` it once per turn.

mod compiled;
mod config;
pub mod logging;
mod mermaid;
mod node;
mod node_middleware;
mod run_context;
mod run_error;
mod state_graph;
mod validation_error;

pub use compiled::CompiledGraph;
pub use config::{GraphConfig, DEFAULT_MAX_STEPS};
pub use logging::LoggingNodeMiddleware;
pub use node::{FnNode, Node};
pub use node_middleware::{NodeFuture, NodeMiddleware, NodeRunFn};
pub use run_context::RunContext;
pub use run_error::RunError;
pub use state_graph::{RouteFn, StateGraph, Successor, END, START};
pub use validation_error::GraphValidationError;
