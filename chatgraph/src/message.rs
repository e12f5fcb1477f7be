//! Conversation message: role, text content, and tool-call linkage.
//!
//! Assistant messages may carry the tool calls they requested (content is then
//! often empty); tool-role messages point back at the call they answer through
//! `tool_call_id`.

use serde::{Deserialize, Serialize};

use crate::state::ToolCall;

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Lowercase wire name (`"system"`, `"user"`, `"assistant"`, `"tool"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversational unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Text content; may be empty when an assistant message only carries tool calls.
    #[serde(default)]
    pub content: String,
    /// Set on tool-role messages: id of the `ToolCall` this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on assistant messages that requested tools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant message that requests the given tool calls.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Tool-role message answering the call with id `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// True for an assistant message with text and no pending tool requests.
    pub fn is_final_reply(&self) -> bool {
        self.role == Role::Assistant && self.tool_calls.is_empty() && !self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_message_links_call_id() {
        let m = Message::tool("call_1", "4");
        assert_eq!(m.role, Role::Tool);
        assert_eq!(m.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(m.content, "4");
    }

    #[test]
    fn assistant_with_tool_calls_is_not_final_reply() {
        let call = ToolCall::new("c1", "calculate", json!({"expression": "1+1"}));
        let m = Message::assistant_with_tool_calls("", vec![call]);
        assert!(!m.is_final_reply());
        assert!(Message::assistant("done").is_final_reply());
        assert!(!Message::assistant("").is_final_reply());
    }

    /// **Scenario**: Serialized form uses lowercase roles and omits empty tool fields.
    #[test]
    fn message_serializes_with_lowercase_role_and_skips_empty_fields() {
        let v = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(v, json!({"role": "user", "content": "hi"}));
        let back: Message = serde_json::from_value(v).unwrap();
        assert_eq!(back, Message::user("hi"));
    }
}
