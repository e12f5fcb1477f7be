//! Tool-level errors: registry failures, handler failures and the structured
//! record of a failed execution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry-level failure. Surfaced to the caller immediately.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A tool with this name is already registered. Registration is not idempotent.
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    /// No tool with this name is registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments violate the tool's parameter schema; every violation is listed.
    #[error("invalid arguments for tool '{tool}': {}", violations.join("; "))]
    InvalidArguments {
        tool: String,
        violations: Vec<String>,
    },

    /// The parameter schema itself is not a valid JSON Schema.
    #[error("invalid parameter schema for tool '{tool}': {reason}")]
    InvalidSchema { tool: String, reason: String },

    /// Registration attempted after the registry was frozen.
    #[error("tool registry is frozen; cannot register '{0}'")]
    Frozen(String),
}

/// Failure returned by a tool handler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// Arguments passed schema validation but are semantically wrong (e.g. division by zero).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool ran and failed.
    #[error("tool failed: {0}")]
    Failed(String),

    /// The tool could not reach an external dependency.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Structured record of a handler failure (returned error or panic).
///
/// The conversation continues with a tool-role message describing the failure;
/// this record goes to the caller for logging and reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("tool '{tool}' (call {call_id}) failed: {cause}")]
pub struct ToolExecutionError {
    pub tool: String,
    pub call_id: String,
    pub cause: String,
}
