//! Scripted LLM for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AgentError;
use crate::message::Message;
use crate::state::ToolCall;
use crate::tools::ToolSpec;

use super::{LlmClient, LlmResponse};

/// Mock LLM: replays a script of responses, one per `generate` call.
///
/// When the script runs out the last entry repeats, so a single-entry script
/// behaves like a fixed response. Scripted `Err` entries become
/// `AgentError::ExecutionFailed`.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<LlmResponse, String>>>,
    last: Mutex<Option<Result<LlmResponse, String>>>,
    calls: AtomicUsize,
}

impl MockLlm {
    /// Replays `responses` in order.
    pub fn scripted(responses: Vec<Result<LlmResponse, String>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `content` and no tool calls.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(LlmResponse::text(content))])
    }

    /// First call requests `tool_name(arguments)`, every later call answers `reply`.
    pub fn with_tool_call_then_reply(
        tool_name: impl Into<String>,
        arguments: Value,
        reply: impl Into<String>,
    ) -> Self {
        let call = ToolCall::new("call_1", tool_name, arguments);
        Self::scripted(vec![
            Ok(LlmResponse::with_tool_calls("", vec![call])),
            Ok(LlmResponse::text(reply)),
        ])
    }

    /// Every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::scripted(vec![Err(message.into())])
    }

    /// Number of `generate` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_entry(&self) -> Result<LlmResponse, String> {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = script.pop_front() {
            *last = Some(entry.clone());
            entry
        } else {
            last.clone()
                .unwrap_or_else(|| Err("mock llm has an empty script".to_string()))
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn generate(
        &self,
        _messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next_entry().map_err(AgentError::ExecutionFailed)
    }
}
