//! Conversation state threaded through every node of a turn, and the partial
//! update a node returns.
//!
//! Merge rules (applied by [`ConversationState::apply`]):
//!
//! | field               | rule                                        |
//! |---------------------|---------------------------------------------|
//! | `messages`          | append                                      |
//! | `pending_tool_calls`| keep / replace / clear ([`PendingUpdate`])  |
//! | `metadata`          | per-key overwrite                           |
//! | `turn_complete`     | overwrite when set                          |
//!
//! `mode` has no update slot: it is fixed when the conversation is created.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{Message, Role};

/// Metadata key holding the conversation's session id.
pub const SESSION_ID_KEY: &str = "session_id";

/// Channel through which a conversation happens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Text,
    Voice,
    Realtime,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Voice => "voice",
            Mode::Realtime => "realtime",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            "realtime" => Ok(Self::Realtime),
            _ => Err(format!("unknown mode: {} (use text, voice, or realtime)", s)),
        }
    }
}

/// One tool invocation requested by the model.
///
/// Never mutated after creation; a retry is a new `ToolCall` with a new id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within the turn; echoed back as `Message::tool_call_id`.
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Creates a call from a JSON value. Non-object arguments are treated as empty.
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// How a [`StateUpdate`] changes `pending_tool_calls`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PendingUpdate {
    /// Leave the pending calls untouched.
    #[default]
    Keep,
    /// Replace the pending calls (model responded with tool calls).
    Replace(Vec<ToolCall>),
    /// Drop all pending calls (tool results applied, or final reply).
    Clear,
}

/// Partial state returned by a node. Every field defaults to "no change".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateUpdate {
    /// Appended to `ConversationState::messages`.
    pub messages: Vec<Message>,
    pub pending_tool_calls: PendingUpdate,
    /// Each key overwrites the same key in `ConversationState::metadata`.
    pub metadata: BTreeMap<String, Value>,
    pub turn_complete: Option<bool>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn set_pending(mut self, calls: Vec<ToolCall>) -> Self {
        self.pending_tool_calls = PendingUpdate::Replace(calls);
        self
    }

    pub fn clear_pending(mut self) -> Self {
        self.pending_tool_calls = PendingUpdate::Clear;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn complete_turn(mut self) -> Self {
        self.turn_complete = Some(true);
        self
    }

    /// True when applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.pending_tool_calls == PendingUpdate::Keep
            && self.metadata.is_empty()
            && self.turn_complete.is_none()
    }

    /// Folds `later` into `self`; later writes win, messages append.
    pub fn merge(&mut self, later: StateUpdate) {
        self.messages.extend(later.messages);
        if later.pending_tool_calls != PendingUpdate::Keep {
            self.pending_tool_calls = later.pending_tool_calls;
        }
        self.metadata.extend(later.metadata);
        if later.turn_complete.is_some() {
            self.turn_complete = later.turn_complete;
        }
    }
}

/// Evolving context of one conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Append-only history; persists across turns.
    pub messages: Vec<Message>,
    pub mode: Mode,
    /// Non-empty only between a model response with tool calls and the tool node.
    #[serde(default)]
    pub pending_tool_calls: Vec<ToolCall>,
    /// Side channel between nodes (intent, session id, errors).
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Set by a terminal node; the executor stops when it becomes true.
    #[serde(default)]
    pub turn_complete: bool,
}

impl ConversationState {
    /// Empty conversation in the given mode.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Conversation seeded with a system prompt.
    pub fn with_system_prompt(mode: Mode, prompt: impl Into<String>) -> Self {
        let mut state = Self::new(mode);
        state.messages.push(Message::system(prompt));
        state
    }

    /// Applies `update` as a whole. Consumes the update so it cannot be half-applied.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            messages,
            pending_tool_calls,
            metadata,
            turn_complete,
        } = update;
        self.messages.extend(messages);
        match pending_tool_calls {
            PendingUpdate::Keep => {}
            PendingUpdate::Replace(calls) => self.pending_tool_calls = calls,
            PendingUpdate::Clear => self.pending_tool_calls.clear(),
        }
        self.metadata.extend(metadata);
        if let Some(done) = turn_complete {
            self.turn_complete = done;
        }
    }

    /// Content of the most recent assistant message with text, if any.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.as_str())
    }

    /// Reply produced since the latest user message: the last assistant
    /// message with text after it. `None` when the turn produced no text.
    pub fn turn_reply(&self) -> Option<&str> {
        let start = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .map(|i| i + 1)
            .unwrap_or(0);
        self.messages[start..]
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && !m.content.is_empty())
            .map(|m| m.content.as_str())
    }

    /// Content of the most recent user message, if any.
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.metadata.get(SESSION_ID_KEY).and_then(Value::as_str)
    }
}
