//! Graph node: one single-responsibility step of a turn.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::state::{ConversationState, StateUpdate};

use super::RunContext;

/// A node reads the current state and returns a partial update.
///
/// Nodes should be total: a recoverable failure is encoded into the returned
/// update (an error in metadata, a fallback message). `Err` aborts the turn with
/// `RunError::NodeFailed`.
///
/// The capability flags describe what the node may do; `StateGraph::compile`
/// uses them to reject graphs that could loop forever or leave tool calls
/// unresolved.
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> &str;

    /// The node may set `turn_complete`.
    fn can_complete_turn(&self) -> bool {
        false
    }

    /// The node may fill `pending_tool_calls`.
    fn emits_tool_calls(&self) -> bool {
        false
    }

    /// The node resolves `pending_tool_calls` into tool messages.
    fn resolves_tool_calls(&self) -> bool {
        false
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError>;

    /// Streaming- and cancellation-aware variant. Defaults to `run`.
    async fn run_with_context(
        &self,
        state: &ConversationState,
        _ctx: &RunContext,
    ) -> Result<StateUpdate, AgentError> {
        self.run(state).await
    }
}

type UpdateFn = Arc<dyn Fn(&ConversationState) -> StateUpdate + Send + Sync>;

/// Node backed by a pure closure.
///
/// ```rust,ignore
/// let respond = FnNode::new("respond", |_| {
///     StateUpdate::new().message(Message::assistant("ok")).complete_turn()
/// })
/// .can_complete();
/// ```
#[derive(Clone)]
pub struct FnNode {
    id: String,
    f: UpdateFn,
    can_complete_turn: bool,
    emits_tool_calls: bool,
    resolves_tool_calls: bool,
}

impl FnNode {
    pub fn new<F>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ConversationState) -> StateUpdate + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            f: Arc::new(f),
            can_complete_turn: false,
            emits_tool_calls: false,
            resolves_tool_calls: false,
        }
    }

    pub fn can_complete(mut self) -> Self {
        self.can_complete_turn = true;
        self
    }

    pub fn emitting_tool_calls(mut self) -> Self {
        self.emits_tool_calls = true;
        self
    }

    pub fn resolving_tool_calls(mut self) -> Self {
        self.resolves_tool_calls = true;
        self
    }
}

#[async_trait]
impl Node for FnNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn can_complete_turn(&self) -> bool {
        self.can_complete_turn
    }

    fn emits_tool_calls(&self) -> bool {
        self.emits_tool_calls
    }

    fn resolves_tool_calls(&self) -> bool {
        self.resolves_tool_calls
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        Ok((self.f)(state))
    }
}
