//! Tools node: resolve every pending tool call through the registry.
//!
//! Appends one tool-role message per call, in call order, then clears
//! `pending_tool_calls`. No failure escapes the node: registry errors (unknown
//! tool, invalid arguments) and handler failures both become tool messages the
//! model can read, and are appended to `metadata["tool_errors"]`, which the
//! engine resets at the start of every turn.
//!
//! With `StreamMode::Custom` enabled, `tool_started` / `tool_finished` events
//! are published around each call.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::AgentError;
use crate::graph::{Node, RunContext};
use crate::message::Message;
use crate::state::{ConversationState, StateUpdate, ToolCall};
use crate::stream::{StreamEvent, StreamMode};
use crate::tools::{ToolCallContext, ToolExecutionError, ToolRegistry};

pub const TOOLS_NODE: &str = "tools";

/// Metadata key holding the structured tool failures of the current turn.
pub const TOOL_ERRORS_KEY: &str = "tool_errors";

pub struct ToolsNode {
    registry: Arc<ToolRegistry>,
}

impl ToolsNode {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    async fn resolve(
        &self,
        call: &ToolCall,
        state: &ConversationState,
    ) -> (Message, Option<ToolExecutionError>) {
        let ctx = ToolCallContext {
            call_id: call.id.clone(),
            recent_messages: state.messages.clone(),
            metadata: state.metadata.clone(),
        };
        match self.registry.invoke_with_context(call, &ctx).await {
            Ok(outcome) => (outcome.message, outcome.error),
            Err(e) => {
                warn!(tool = %call.tool_name, call_id = %call.id, error = %e, "tool call rejected");
                let record = ToolExecutionError {
                    tool: call.tool_name.clone(),
                    call_id: call.id.clone(),
                    cause: e.to_string(),
                };
                (e.to_tool_message(&call.id), Some(record))
            }
        }
    }

    async fn run_calls(
        &self,
        state: &ConversationState,
        ctx: Option<&RunContext>,
    ) -> StateUpdate {
        let mut messages = Vec::with_capacity(state.pending_tool_calls.len());
        let mut errors: Vec<Value> = state
            .metadata
            .get(TOOL_ERRORS_KEY)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for call in &state.pending_tool_calls {
            if let Some(ctx) = ctx {
                ctx.emit(
                    StreamMode::Custom,
                    StreamEvent::Custom(json!({
                        "event": "tool_started",
                        "tool": call.tool_name,
                        "call_id": call.id,
                    })),
                )
                .await;
            }
            let (message, error) = self.resolve(call, state).await;
            if let Some(ctx) = ctx {
                ctx.emit(
                    StreamMode::Custom,
                    StreamEvent::Custom(json!({
                        "event": "tool_finished",
                        "tool": call.tool_name,
                        "call_id": call.id,
                        "ok": error.is_none(),
                    })),
                )
                .await;
            }
            if let Some(error) = error {
                errors.push(serde_json::to_value(&error).unwrap_or_else(|_| json!(error.to_string())));
            }
            messages.push(message);
        }
        StateUpdate::new()
            .messages(messages)
            .clear_pending()
            .meta(TOOL_ERRORS_KEY, Value::Array(errors))
    }
}

#[async_trait]
impl Node for ToolsNode {
    fn id(&self) -> &str {
        TOOLS_NODE
    }

    fn resolves_tool_calls(&self) -> bool {
        true
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        Ok(self.run_calls(state, None).await)
    }

    async fn run_with_context(
        &self,
        state: &ConversationState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, AgentError> {
        Ok(self.run_calls(state, Some(ctx)).await)
    }
}
