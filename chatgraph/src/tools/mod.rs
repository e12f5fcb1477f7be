//! Tool registry: the single source of truth for what tools exist and how to
//! call them.
//!
//! A [`ToolDefinition`] pairs a name, a description and a JSON Schema for the
//! arguments with an async [`ToolHandler`]. Definitions are registered into a
//! [`ToolRegistry`] during startup; the registry freezes on first use and is
//! read-only afterwards, so concurrent conversations can invoke tools through a
//! shared `Arc<ToolRegistry>` without locking.

pub mod builtin;
mod definition;
mod error;
mod registry;

pub use definition::{
    handler_fn, ToolCallContent, ToolCallContext, ToolDefinition, ToolHandler, ToolSpec,
};
pub use error::{RegistryError, ToolError, ToolExecutionError};
pub use registry::{
    ToolOutcome, ToolRegistry, DEFAULT_EXECUTION_ERROR_TEMPLATE, DEFAULT_TOOL_ERROR_TEMPLATE,
};
