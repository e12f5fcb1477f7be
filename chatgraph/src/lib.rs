//! # chatgraph
//!
//! A graph-based conversational agent engine. One [`ConversationState`] flows
//! through a graph of nodes; each node returns a partial [`StateUpdate`] that
//! the executor merges before routing to the next node. The same graph and
//! the same tool registry serve text, voice and realtime conversations.
//!
//! ## Design Principles
//!
//! - **Single state type**: every node reads a `ConversationState` and returns
//!   a `StateUpdate`; messages are appended, scalars overwritten, and
//!   `pending_tool_calls` has an explicit keep/replace/clear rule.
//! - **Total nodes**: recoverable failures (LLM errors, failing tools) are
//!   encoded into state. Only programmer errors fail a run.
//! - **Validated graphs**: `StateGraph::compile` rejects unknown targets,
//!   cycles with no node able to end the turn, and tool-emitting nodes that
//!   cannot reach a tool-resolving node.
//! - **Channel-agnostic core**: speech is a capability injected by the mode
//!   handlers; the graph only sees text.
//!
//! ## Main Modules
//!
//! - [`graph`]: `StateGraph`, `CompiledGraph`, `Node`, `NodeMiddleware`, run
//!   errors and validation errors.
//! - [`tools`]: `ToolRegistry`, `ToolDefinition`, `ToolHandler` and the
//!   built-in tools.
//! - [`nodes`]: prompt, model and tools nodes and `build_chat_graph`.
//! - [`llm`]: `LlmClient` trait and `MockLlm`.
//! - [`modes`]: `ChatEngine`, text / voice handlers and realtime sessions.
//! - [`stream`]: stream modes and events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatgraph::modes::{TextHandler, TurnHandler};
//! use chatgraph::tools::builtin::register_builtin_tools;
//! use chatgraph::{ChatEngine, ChatGraphOptions, MockLlm, ToolRegistry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut registry = ToolRegistry::new();
//! register_builtin_tools(&mut registry).unwrap();
//! let engine = ChatEngine::from_llm(
//!     Arc::new(MockLlm::with_no_tool_calls("4")),
//!     Arc::new(registry),
//!     ChatGraphOptions::default(),
//! )
//! .unwrap();
//!
//! let handler = TextHandler::new(engine);
//! let mut state = handler.build_initial_state();
//! let reply = handler.handle(&mut state, "2+2?".to_string()).await.unwrap();
//! assert_eq!(reply.text, "4");
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod llm;
pub mod message;
pub mod modes;
pub mod nodes;
pub mod state;
pub mod stream;
pub mod tools;

pub use error::AgentError;
pub use graph::{
    CompiledGraph, GraphConfig, GraphValidationError, Node, NodeMiddleware, RunContext, RunError,
    StateGraph, END, START,
};
pub use llm::{LlmClient, LlmResponse, MockLlm, ToolChoiceMode};
pub use message::{Message, Role};
pub use modes::{ChatEngine, ModeError, ModeHandler, TurnHandler, TurnReport};
pub use nodes::{build_chat_graph, ChatGraphOptions, DEFAULT_SYSTEM_PROMPT};
pub use state::{ConversationState, Mode, PendingUpdate, StateUpdate, ToolCall};
pub use stream::{StreamEvent, StreamMode};
pub use tools::{
    RegistryError, ToolCallContent, ToolDefinition, ToolError, ToolExecutionError, ToolRegistry,
    ToolSpec,
};
