//! Shared nodes for state graph tests.

use std::sync::Arc;

use chatgraph::graph::FnNode;
use chatgraph::{ConversationState, Message, Mode, Node, StateUpdate};

/// Node that appends an assistant echo of the last user message and ends the turn.
pub fn echo_node(id: &str) -> Arc<dyn Node> {
    Arc::new(
        FnNode::new(id, |s: &ConversationState| {
            let text = s.last_user_message().unwrap_or_default().to_string();
            StateUpdate::new()
                .message(Message::assistant(text))
                .complete_turn()
        })
        .can_complete(),
    )
}

/// Node that returns an empty update and cannot end the turn.
pub fn pass_node(id: &str) -> Arc<dyn Node> {
    Arc::new(FnNode::new(id, |_| StateUpdate::new()))
}

/// Node that appends one assistant message tagged with `id` and may end the turn.
pub fn tagging_node(id: &'static str) -> Arc<dyn Node> {
    Arc::new(
        FnNode::new(id, move |_| {
            StateUpdate::new().message(Message::assistant(id))
        })
        .can_complete(),
    )
}

pub fn user_state(text: &str) -> ConversationState {
    let mut state = ConversationState::new(Mode::Text);
    state.messages.push(Message::user(text));
    state
}
