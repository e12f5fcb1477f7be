//! Built-in tools shipped with the engine.

mod calculate;
mod recent_messages;
mod time;

pub use calculate::{calculate_tool, evaluate, CalculateTool, TOOL_CALCULATE};
pub use recent_messages::{recent_messages_tool, GetRecentMessagesTool, TOOL_GET_RECENT_MESSAGES};
pub use time::{current_time_tool, GetCurrentTimeTool, TOOL_GET_CURRENT_TIME};

use super::{RegistryError, ToolRegistry};

/// Registers every built-in tool, in a fixed order.
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(calculate_tool())?;
    registry.register(current_time_tool())?;
    registry.register(recent_messages_tool())?;
    Ok(())
}
