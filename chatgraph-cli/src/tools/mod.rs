//! Tool catalog used by CLI runs.

use chatgraph::tools::builtin::register_builtin_tools;
use chatgraph::{RegistryError, ToolRegistry};

/// Registry with the built-in tools (calculate, get_current_time, get_recent_messages).
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry)?;
    Ok(registry)
}
