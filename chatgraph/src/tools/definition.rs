//! Tool definition and handler contract.
//!
//! A handler receives the validated argument map plus a read-only
//! [`ToolCallContext`] and returns content convertible into a tool-role message.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::Message;

use super::error::ToolError;

/// Tool description advertised to the model (name, description, input schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
}

/// Result of a successful tool call, rendered as the tool message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallContent {
    pub text: String,
}

impl From<String> for ToolCallContent {
    fn from(text: String) -> Self {
        Self { text }
    }
}

impl From<&str> for ToolCallContent {
    fn from(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

impl From<Value> for ToolCallContent {
    /// Strings are used verbatim; any other value is serialized as JSON.
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self { text: s },
            other => Self {
                text: other.to_string(),
            },
        }
    }
}

/// Per-call context available to handlers.
#[derive(Debug, Clone, Default)]
pub struct ToolCallContext {
    /// Id of the ToolCall being executed.
    pub call_id: String,
    /// Messages of the conversation at the time of the call.
    pub recent_messages: Vec<Message>,
    /// Snapshot of the conversation metadata.
    pub metadata: BTreeMap<String, Value>,
}

impl ToolCallContext {
    pub fn for_call(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            ..Default::default()
        }
    }
}

/// Executable capability behind a tool.
///
/// Execution time is unbounded and usually I/O bound. Handlers with external
/// side effects own their concurrency discipline; the registry never locks.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        arguments: Map<String, Value>,
        ctx: &ToolCallContext,
    ) -> Result<ToolCallContent, ToolError>;
}

struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Map<String, Value>, ToolCallContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolCallContent, ToolError>> + Send + 'static,
{
    async fn call(
        &self,
        arguments: Map<String, Value>,
        ctx: &ToolCallContext,
    ) -> Result<ToolCallContent, ToolError> {
        (self.f)(arguments, ctx.clone()).await
    }
}

/// Wraps an async closure as a handler.
///
/// ```rust,ignore
/// let echo = handler_fn(|args, _ctx| async move {
///     Ok(ToolCallContent::from(serde_json::Value::Object(args)))
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Map<String, Value>, ToolCallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ToolCallContent, ToolError>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Registry entry: name, description, parameter schema and handler.
///
/// Immutable once built; the registry owns it behind an `Arc`.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameter_schema: Value,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: Value,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Spec advertised to the model provider.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.parameter_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameter_schema", &self.parameter_schema)
            .field("handler", &"<handler>")
            .finish()
    }
}
