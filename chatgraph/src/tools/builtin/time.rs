//! `get_current_time`: local wall-clock time.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ToolCallContent, ToolCallContext, ToolDefinition, ToolError, ToolHandler};

pub const TOOL_GET_CURRENT_TIME: &str = "get_current_time";

/// Returns the local time as `YYYY-MM-DD HH:MM:SS`.
pub struct GetCurrentTimeTool;

#[async_trait]
impl ToolHandler for GetCurrentTimeTool {
    async fn call(
        &self,
        _arguments: Map<String, Value>,
        _ctx: &ToolCallContext,
    ) -> Result<ToolCallContent, ToolError> {
        let now = chrono::Local::now();
        Ok(ToolCallContent::from(format!(
            "Current time: {}",
            now.format("%Y-%m-%d %H:%M:%S")
        )))
    }
}

pub fn current_time_tool() -> ToolDefinition {
    ToolDefinition::new(
        TOOL_GET_CURRENT_TIME,
        "Get the current local date and time.",
        json!({ "type": "object", "properties": {} }),
        Arc::new(GetCurrentTimeTool),
    )
}
