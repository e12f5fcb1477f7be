//! `get_recent_messages`: lets the model look back over the conversation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ToolCallContent, ToolCallContext, ToolDefinition, ToolError, ToolHandler};

pub const TOOL_GET_RECENT_MESSAGES: &str = "get_recent_messages";

const DEFAULT_LIMIT: usize = 10;

/// Returns the last `limit` messages from the call context as a JSON array of
/// `{role, content}` objects.
pub struct GetRecentMessagesTool;

#[async_trait]
impl ToolHandler for GetRecentMessagesTool {
    async fn call(
        &self,
        arguments: Map<String, Value>,
        ctx: &ToolCallContext,
    ) -> Result<ToolCallContent, ToolError> {
        let limit = arguments
            .get("limit")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_LIMIT);
        let skip = ctx.recent_messages.len().saturating_sub(limit);
        let items: Vec<Value> = ctx
            .recent_messages
            .iter()
            .skip(skip)
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        Ok(ToolCallContent::from(Value::Array(items)))
    }
}

pub fn recent_messages_tool() -> ToolDefinition {
    ToolDefinition::new(
        TOOL_GET_RECENT_MESSAGES,
        "Get the most recent messages of the current conversation.",
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of messages to return (default 10)."
                }
            }
        }),
        Arc::new(GetRecentMessagesTool),
    )
}
