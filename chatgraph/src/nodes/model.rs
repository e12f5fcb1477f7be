//! Model node: call the LLM with the conversation and the tool catalog.
//!
//! With tool calls in the response it appends an assistant message carrying
//! them and fills `pending_tool_calls`; otherwise the content is the final
//! reply and the turn completes.
//!
//! # Streaming Support
//!
//! When `stream_mode` contains `StreamMode::Messages`, the reply text is sent as
//! a `StreamEvent::Messages` chunk tagged with node id `"model"`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::graph::{Node, RunContext};
use crate::llm::{LlmClient, LlmResponse};
use crate::message::{Message, Role};
use crate::state::{ConversationState, StateUpdate, ToolCall};
use crate::stream::{MessageChunk, StreamEvent, StreamMetadata, StreamMode};
use crate::tools::ToolRegistry;

use super::ERROR_KEY;

pub const MODEL_NODE: &str = "model";

/// Reply appended when the LLM call fails, so the turn still ends with an
/// assistant message.
pub const FALLBACK_REPLY: &str =
    "I'm sorry, I wasn't able to complete that request. Please try again.";

/// Model node: one LLM call per execution.
///
/// **Interaction**: Implements `Node`; reads `messages`, writes `messages`,
/// `pending_tool_calls` and `turn_complete`. The catalog comes from
/// `ToolRegistry::specs`.
pub struct ModelNode {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
}

impl ModelNode {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }

    /// Ids of the tool calls already requested in the current turn, i.e. on
    /// assistant messages after the last user message.
    fn turn_call_ids(state: &ConversationState) -> HashSet<String> {
        let turn_start = state
            .messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .map_or(0, |i| i + 1);
        state.messages[turn_start..]
            .iter()
            .flat_map(|m| m.tool_calls.iter().map(|c| c.id.clone()))
            .collect()
    }

    /// Makes call ids unique within the turn. Empty ids and ids already used
    /// in this turn (or earlier in the same response) are rewritten to
    /// `call_{position}_{index}`, which is stable for a given history.
    fn assign_ids(
        state: &ConversationState,
        position: usize,
        calls: Vec<ToolCall>,
    ) -> Vec<ToolCall> {
        let mut used = Self::turn_call_ids(state);
        calls
            .into_iter()
            .enumerate()
            .map(|(i, mut call)| {
                if call.id.is_empty() || used.contains(&call.id) {
                    let original = std::mem::take(&mut call.id);
                    let mut candidate = format!("call_{}_{}", position, i);
                    let mut n = 1;
                    while used.contains(&candidate) {
                        candidate = format!("call_{}_{}_{}", position, i, n);
                        n += 1;
                    }
                    if !original.is_empty() {
                        debug!(from = %original, to = %candidate, "rewrote duplicate tool call id");
                    }
                    call.id = candidate;
                }
                used.insert(call.id.clone());
                call
            })
            .collect()
    }

    fn update_from(state: &ConversationState, response: LlmResponse) -> StateUpdate {
        if response.tool_calls.is_empty() {
            return StateUpdate::new()
                .message(Message::assistant(response.content))
                .clear_pending()
                .complete_turn();
        }
        let calls = Self::assign_ids(state, state.messages.len(), response.tool_calls);
        debug!(
            count = calls.len(),
            tools = ?calls.iter().map(|c| c.tool_name.as_str()).collect::<Vec<_>>(),
            "model requested tool calls"
        );
        StateUpdate::new()
            .message(Message::assistant_with_tool_calls(
                response.content,
                calls.clone(),
            ))
            .set_pending(calls)
    }

    fn fallback(error: &AgentError) -> StateUpdate {
        warn!(error = %error, "model call failed; replying with fallback");
        StateUpdate::new()
            .message(Message::assistant(FALLBACK_REPLY))
            .clear_pending()
            .meta(ERROR_KEY, error.to_string())
            .complete_turn()
    }
}

#[async_trait]
impl Node for ModelNode {
    fn id(&self) -> &str {
        MODEL_NODE
    }

    fn can_complete_turn(&self) -> bool {
        true
    }

    fn emits_tool_calls(&self) -> bool {
        true
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        let tools = self.registry.specs();
        match self.llm.generate(&state.messages, &tools).await {
            Ok(response) => Ok(Self::update_from(state, response)),
            Err(e) => Ok(Self::fallback(&e)),
        }
    }

    async fn run_with_context(
        &self,
        state: &ConversationState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, AgentError> {
        let update = self.run(state).await?;
        if ctx.streams(StreamMode::Messages) {
            for m in update.messages.iter().filter(|m| !m.content.is_empty()) {
                ctx.emit(
                    StreamMode::Messages,
                    StreamEvent::Messages {
                        chunk: MessageChunk {
                            content: m.content.clone(),
                        },
                        metadata: StreamMetadata {
                            node_id: MODEL_NODE.to_string(),
                        },
                    },
                )
                .await;
            }
        }
        Ok(update)
    }
}
