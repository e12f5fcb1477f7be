//! Shared turn runner used by every mode handler.
//!
//! `ChatEngine` owns the compiled graph and the tool registry. Handlers call
//! into it once per user utterance; the engine resets per-turn bookkeeping,
//! runs the graph and degrades gracefully when the run fails.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::graph::{CompiledGraph, GraphValidationError, RunContext, RunError};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::nodes::{
    build_chat_graph, ChatGraphOptions, DEFAULT_SYSTEM_PROMPT, ERROR_KEY, FALLBACK_REPLY,
    TOOL_ERRORS_KEY,
};
use crate::state::{ConversationState, Mode, StateUpdate, SESSION_ID_KEY};
use crate::tools::{ToolExecutionError, ToolRegistry};

/// Result of one turn with its diagnostics.
#[derive(Debug)]
pub struct TurnReport {
    /// State after the turn. Holds the fallback reply when `error` is set.
    pub state: ConversationState,
    /// Run failure that was recovered from, if any.
    pub error: Option<RunError>,
    /// Tool failures the model saw as tool messages during this turn.
    pub tool_errors: Vec<ToolExecutionError>,
}

impl TurnReport {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Compiled graph plus frozen tool registry, shared by all conversations.
#[derive(Clone, Debug)]
pub struct ChatEngine {
    graph: Arc<CompiledGraph>,
    registry: Arc<ToolRegistry>,
    system_prompt: String,
}

impl ChatEngine {
    /// Wraps `graph`. Freezes `registry`: no tool can be added once an engine exists.
    pub fn new(graph: CompiledGraph, registry: Arc<ToolRegistry>) -> Self {
        registry.freeze();
        Self {
            graph: Arc::new(graph),
            registry,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Builds the prebuilt model ⇄ tools graph and wraps it.
    pub fn from_llm(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        options: ChatGraphOptions,
    ) -> Result<Self, GraphValidationError> {
        let prompt = options.system_prompt.clone();
        let graph = build_chat_graph(llm, registry.clone(), options)?;
        Ok(Self::new(graph, registry).with_system_prompt(prompt))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Fresh conversation: system prompt plus a new `session_id`.
    pub fn start_conversation(&self, mode: Mode) -> ConversationState {
        let mut state = ConversationState::with_system_prompt(mode, self.system_prompt.clone());
        state.apply(StateUpdate::new().meta(SESSION_ID_KEY, Uuid::new_v4().to_string()));
        info!(session_id = ?state.session_id(), mode = %mode, "conversation started");
        state
    }

    /// Runs one turn. On error the partial run is gone; `state` as passed in
    /// is what the caller should keep.
    pub async fn try_run_turn(
        &self,
        state: ConversationState,
        ctx: &RunContext,
    ) -> Result<ConversationState, RunError> {
        let mut state = state;
        state.metadata.remove(ERROR_KEY);
        state
            .metadata
            .insert(TOOL_ERRORS_KEY.to_string(), Value::Array(Vec::new()));
        self.graph.run_with_context(state, ctx).await
    }

    /// Runs one turn and never fails: a run error yields the pre-turn state
    /// plus the fallback reply.
    pub async fn run_turn(&self, state: ConversationState) -> ConversationState {
        self.run_turn_reported(state).await.state
    }

    pub async fn run_turn_reported(&self, state: ConversationState) -> TurnReport {
        self.run_turn_reported_with(state, &RunContext::default())
            .await
    }

    /// `run_turn_reported` with streaming and cancellation from `ctx`.
    pub async fn run_turn_reported_with(
        &self,
        state: ConversationState,
        ctx: &RunContext,
    ) -> TurnReport {
        let pre_turn = state.clone();
        match self.try_run_turn(state, ctx).await {
            Ok(state) => {
                let tool_errors = tool_errors_of(&state);
                TurnReport {
                    state,
                    error: None,
                    tool_errors,
                }
            }
            Err(e) => {
                let state = self.recover(pre_turn, &e);
                TurnReport {
                    state,
                    error: Some(e),
                    tool_errors: Vec::new(),
                }
            }
        }
    }

    /// Appends the fallback reply for a failed run and completes the turn.
    pub fn recover(&self, state: ConversationState, err: &RunError) -> ConversationState {
        error!(session_id = ?state.session_id(), error = %err, "turn failed; replying with fallback");
        let mut state = state;
        state.apply(
            StateUpdate::new()
                .message(Message::assistant(FALLBACK_REPLY))
                .clear_pending()
                .meta(ERROR_KEY, err.to_string())
                .complete_turn(),
        );
        state
    }
}

/// Structured tool failures recorded in `metadata["tool_errors"]`.
pub fn tool_errors_of(state: &ConversationState) -> Vec<ToolExecutionError> {
    state
        .metadata
        .get(TOOL_ERRORS_KEY)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FnNode, StateGraph, END, START};
    use crate::llm::MockLlm;
    use crate::message::Role;
    use crate::tools::builtin::register_builtin_tools;
    use serde_json::json;

    fn engine_with(llm: MockLlm) -> ChatEngine {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry).unwrap();
        ChatEngine::from_llm(Arc::new(llm), Arc::new(registry), ChatGraphOptions::default())
            .unwrap()
    }

    /// **Scenario**: creating an engine freezes the registry.
    #[test]
    fn engine_freezes_registry() {
        let engine = engine_with(MockLlm::with_no_tool_calls("hi"));
        assert!(engine.registry().is_frozen());
    }

    /// **Scenario**: a new conversation has the system prompt and a session id.
    #[test]
    fn start_conversation_seeds_prompt_and_session() {
        let engine = engine_with(MockLlm::with_no_tool_calls("hi")).with_system_prompt("be brief");
        let a = engine.start_conversation(Mode::Voice);
        let b = engine.start_conversation(Mode::Voice);
        assert_eq!(a.mode, Mode::Voice);
        assert_eq!(a.messages, vec![Message::system("be brief")]);
        assert!(a.session_id().is_some());
        assert_ne!(a.session_id(), b.session_id());
    }

    /// **Scenario**: a tool failure is reported without degrading the turn.
    #[tokio::test]
    async fn reported_turn_lists_tool_errors() {
        let engine = engine_with(MockLlm::with_tool_call_then_reply(
            "calculate",
            json!({"expression": "1/0"}),
            "cannot divide by zero",
        ));
        let mut state = engine.start_conversation(Mode::Text);
        state.messages.push(Message::user("1/0?"));

        let report = engine.run_turn_reported(state).await;
        assert!(!report.is_degraded());
        assert_eq!(report.tool_errors.len(), 1);
        assert_eq!(report.tool_errors[0].tool, "calculate");
        assert_eq!(report.state.turn_reply(), Some("cannot divide by zero"));
    }

    /// **Scenario**: tool errors of a previous turn do not leak into the next.
    #[tokio::test]
    async fn tool_errors_reset_each_turn() {
        let engine = engine_with(MockLlm::with_no_tool_calls("ok"));
        let mut state = engine.start_conversation(Mode::Text);
        state
            .metadata
            .insert(TOOL_ERRORS_KEY.into(), json!([{"tool": "x", "call_id": "c", "cause": "y"}]));
        state.messages.push(Message::user("hello"));
        let report = engine.run_turn_reported(state).await;
        assert!(report.tool_errors.is_empty());
    }

    /// **Scenario**: a step-limit failure degrades into the fallback reply on top
    /// of the pre-turn state.
    #[tokio::test]
    async fn run_error_degrades_to_fallback_reply() {
        let mut g = StateGraph::new();
        g.add_node(
            "a",
            Arc::new(
                FnNode::new("a", |_| StateUpdate::new().message(Message::assistant("..."))).can_complete(),
            ),
        );
        g.add_edge(START, "a");
        g.add_conditional_edges("a", |_| "a".to_string(), ["a", END]);
        let engine = ChatEngine::new(g.compile().unwrap(), Arc::new(ToolRegistry::new()));

        let mut state = engine.start_conversation(Mode::Text);
        state.messages.push(Message::user("loop"));
        let before = state.messages.len();

        let report = engine.run_turn_reported(state).await;
        assert!(matches!(report.error, Some(RunError::StepLimit { .. })));
        let state = report.state;
        assert_eq!(state.messages.len(), before + 1);
        let last = state.messages.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, FALLBACK_REPLY);
        assert!(state.turn_complete);
        assert!(state.metadata.contains_key(ERROR_KEY));
    }
}
