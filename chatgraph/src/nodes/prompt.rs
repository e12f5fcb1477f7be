//! Prompt node: makes sure the conversation carries a system prompt.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::graph::Node;
use crate::message::{Message, Role};
use crate::state::{ConversationState, StateUpdate};

pub const PROMPT_NODE: &str = "prompt";

/// Default system prompt: general assistant with tool-usage rules.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. You have access to tools that can help you answer questions.

RULES FOR TOOL USAGE:
1. Only use tools when the user's request requires information you don't have or an action you can't perform directly.
2. For greetings, casual conversation, or questions you can answer from your own knowledge, do not use tools. Just respond naturally.
3. Use tools when the user needs real-time data (such as the current time), exact arithmetic, or explicitly asks you to perform an action.

If you're unsure whether to use a tool, prefer responding directly.";

/// Appends the system prompt when the conversation has no system message yet.
/// Messages are append-only, so a conversation started without one gets it
/// after the first user message.
pub struct PromptNode {
    prompt: String,
}

impl PromptNode {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

impl Default for PromptNode {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[async_trait]
impl Node for PromptNode {
    fn id(&self) -> &str {
        PROMPT_NODE
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        if state.messages.iter().any(|m| m.role == Role::System) {
            return Ok(StateUpdate::new());
        }
        Ok(StateUpdate::new().message(Message::system(self.prompt.clone())))
    }
}
