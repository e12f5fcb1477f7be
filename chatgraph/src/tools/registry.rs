//! Insertion-ordered tool registry with schema validation and a freeze switch.
//!
//! Lifecycle: mutable while the process registers tools, frozen once the first
//! conversation starts (explicit `freeze`, or implicitly on the first `invoke`).
//! `register` after the freeze fails with `RegistryError::Frozen`.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::Message;
use crate::state::ToolCall;

use super::definition::{ToolCallContext, ToolDefinition, ToolSpec};
use super::error::{RegistryError, ToolExecutionError};

/// Tool message for registry errors (unknown tool, invalid arguments).
pub const DEFAULT_TOOL_ERROR_TEMPLATE: &str = "Error: {error}\n Please fix your mistakes.";

/// Tool message for handler failures, with tool name and arguments.
pub const DEFAULT_EXECUTION_ERROR_TEMPLATE: &str =
    "Error executing tool '{tool_name}' with kwargs {tool_kwargs} with error:\n {error}\n Please fix the error and try again.";

fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

impl RegistryError {
    /// Renders this error as the tool-role message answering `call_id`, so the
    /// model can see the failure and correct itself.
    pub fn to_tool_message(&self, call_id: &str) -> Message {
        Message::tool(
            call_id,
            DEFAULT_TOOL_ERROR_TEMPLATE.replace("{error}", &self.to_string()),
        )
    }
}

/// Result of running a tool call: the message to append, plus the structured
/// error when the handler failed.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Tool-role message whose `tool_call_id` equals the call's id.
    pub message: Message,
    pub error: Option<ToolExecutionError>,
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

struct RegisteredTool {
    definition: Arc<ToolDefinition>,
    validator: jsonschema::Validator,
}

/// Process-wide tool catalog.
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
    frozen: AtomicBool,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            frozen: AtomicBool::new(false),
        }
    }

    /// Adds a definition keyed by its name.
    ///
    /// Fails on a duplicate name, an uncompilable schema, or a frozen registry;
    /// the registry is unchanged on failure.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), RegistryError> {
        let name = definition.name().to_string();
        if self.is_frozen() {
            return Err(RegistryError::Frozen(name));
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        let validator = jsonschema::validator_for(definition.parameter_schema()).map_err(|e| {
            RegistryError::InvalidSchema {
                tool: name.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!(tool = %name, "registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(RegisteredTool {
            definition: Arc::new(definition),
            validator,
        });
        Ok(())
    }

    /// Freezes the registry; later `register` calls fail.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn get(&self, name: &str) -> Result<&Arc<ToolDefinition>, RegistryError> {
        self.entry(name).map(|t| &t.definition)
    }

    fn entry(&self, name: &str) -> Result<&RegisteredTool, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// All definitions in registration order. The iterator is `Clone`, so it
    /// can be restarted without touching the registry again.
    pub fn list(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> + Clone + '_ {
        self.tools.iter().map(|t| &t.definition)
    }

    /// Tool catalog for the model provider, in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.list().map(|d| d.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.list().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Checks `arguments` against the named tool's schema, collecting every violation.
    pub fn validate(&self, name: &str, arguments: &Value) -> Result<(), RegistryError> {
        let entry = self.entry(name)?;
        let violations: Vec<String> = entry
            .validator
            .iter_errors(arguments)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::InvalidArguments {
                tool: name.to_string(),
                violations,
            })
        }
    }

    /// Invokes a tool call with a context carrying only the call id.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolOutcome, RegistryError> {
        self.invoke_with_context(call, &ToolCallContext::for_call(call.id.clone()))
            .await
    }

    /// Looks up the tool, validates the arguments, runs the handler and wraps
    /// the result as a tool-role message answering `call.id`.
    ///
    /// Unknown tools and invalid arguments return `Err` before the handler is
    /// touched. A handler error or panic is not an `Err`: the outcome carries a
    /// failure message for the conversation plus a [`ToolExecutionError`].
    pub async fn invoke_with_context(
        &self,
        call: &ToolCall,
        ctx: &ToolCallContext,
    ) -> Result<ToolOutcome, RegistryError> {
        self.freeze();
        let entry = self.entry(&call.tool_name)?;
        let args = Value::Object(call.arguments.clone());
        self.validate(&call.tool_name, &args)?;

        debug!(tool = %call.tool_name, call_id = %call.id, "invoking tool");
        let handler = entry.definition.handler().clone();
        let result = AssertUnwindSafe(handler.call(call.arguments.clone(), ctx))
            .catch_unwind()
            .await;

        let cause = match result {
            Ok(Ok(content)) => {
                debug!(
                    tool = %call.tool_name,
                    call_id = %call.id,
                    result = %truncate_for_log(&content.text, 200),
                    "tool finished"
                );
                return Ok(ToolOutcome {
                    message: Message::tool(call.id.clone(), content.text),
                    error: None,
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
        };

        warn!(tool = %call.tool_name, call_id = %call.id, error = %cause, "tool failed");
        let text = DEFAULT_EXECUTION_ERROR_TEMPLATE
            .replace("{tool_name}", &call.tool_name)
            .replace("{tool_kwargs}", &args.to_string())
            .replace("{error}", &cause);
        Ok(ToolOutcome {
            message: Message::tool(call.id.clone(), text),
            error: Some(ToolExecutionError {
                tool: call.tool_name.clone(),
                call_id: call.id.clone(),
                cause,
            }),
        })
    }
}
