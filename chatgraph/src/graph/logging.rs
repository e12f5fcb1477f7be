//! Logging utilities for graph execution.
//!
//! Structured `tracing` events for graph start/finish, node execution, state
//! updates and errors, plus [`LoggingNodeMiddleware`] for verbose runs.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::error::AgentError;
use crate::state::{ConversationState, PendingUpdate, StateUpdate};

use super::node_middleware::{NodeMiddleware, NodeRunFn};
use super::RunError;

pub fn log_graph_start(entry: &str, messages: usize) {
    info!(entry = entry, messages = messages, "Starting graph execution");
}

pub fn log_graph_complete(steps: usize, turn_complete: bool) {
    info!(steps = steps, turn_complete = turn_complete, "Graph execution complete");
}

pub fn log_graph_error(error: &RunError) {
    error!(error = %error, "Graph execution error");
}

pub fn log_node_start(node_id: &str, step: usize) {
    debug!(node_id = node_id, step = step, "Starting node execution");
}

/// `next` is `None` when the run stops after this node.
pub fn log_node_complete(node_id: &str, next: Option<&str>) {
    debug!(node_id = node_id, next = next.unwrap_or("<stop>"), "Node execution complete");
}

pub fn log_state_update(node_id: &str, update: &StateUpdate) {
    let pending = match &update.pending_tool_calls {
        PendingUpdate::Keep => "keep".to_string(),
        PendingUpdate::Replace(calls) => format!("replace({})", calls.len()),
        PendingUpdate::Clear => "clear".to_string(),
    };
    debug!(
        node_id = node_id,
        appended = update.messages.len(),
        pending = %pending,
        metadata_keys = update.metadata.len(),
        turn_complete = ?update.turn_complete,
        "State updated"
    );
}

/// Middleware that logs node enter/exit with elapsed time.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNodeMiddleware;

#[async_trait]
impl NodeMiddleware for LoggingNodeMiddleware {
    async fn around_run(
        &self,
        node_id: &str,
        state: ConversationState,
        inner: NodeRunFn,
    ) -> Result<StateUpdate, AgentError> {
        debug!(node_id = node_id, messages = state.messages.len(), "node enter");
        let started = Instant::now();
        let result = inner(state).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(update) => debug!(
                node_id = node_id,
                elapsed_ms = elapsed_ms,
                appended = update.messages.len(),
                "node exit"
            ),
            Err(e) => error!(node_id = node_id, elapsed_ms = elapsed_ms, error = %e, "node exit with error"),
        }
        result
    }
}
