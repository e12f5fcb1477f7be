//! Node functions of the chat graph and the prebuilt model ⇄ tools graph.
//!
//! ```text
//! START → prompt → model ─┬─(pending tool calls)→ tools → model
//!                         └─(final reply)────────→ END
//! ```

mod model;
mod prompt;
mod tools;

pub use model::{ModelNode, FALLBACK_REPLY, MODEL_NODE};
pub use prompt::{PromptNode, DEFAULT_SYSTEM_PROMPT, PROMPT_NODE};
pub use tools::{ToolsNode, TOOLS_NODE, TOOL_ERRORS_KEY};

use std::sync::Arc;

use crate::graph::{
    CompiledGraph, GraphConfig, GraphValidationError, LoggingNodeMiddleware, StateGraph, END,
    START,
};
use crate::llm::LlmClient;
use crate::state::ConversationState;
use crate::tools::ToolRegistry;

/// Metadata key where the model node records an LLM failure.
pub const ERROR_KEY: &str = "error";

/// Routing function after the model node: `tools` while calls are pending,
/// otherwise `END`.
pub fn route_after_model(state: &ConversationState) -> String {
    if state.pending_tool_calls.is_empty() {
        END.to_string()
    } else {
        TOOLS_NODE.to_string()
    }
}

/// Options for [`build_chat_graph`].
#[derive(Clone, Debug)]
pub struct ChatGraphOptions {
    pub max_steps: usize,
    /// Wrap every node in `LoggingNodeMiddleware`.
    pub verbose: bool,
    /// Prompt inserted by the prompt node when the conversation has none.
    pub system_prompt: String,
}

impl Default for ChatGraphOptions {
    fn default() -> Self {
        Self {
            max_steps: GraphConfig::default().max_steps,
            verbose: false,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Builds the prompt → model ⇄ tools graph over `llm` and `registry`.
pub fn build_chat_graph(
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    options: ChatGraphOptions,
) -> Result<CompiledGraph, GraphValidationError> {
    let mut graph = StateGraph::new().with_config(GraphConfig::with_max_steps(options.max_steps));
    if options.verbose {
        graph = graph.with_middleware(Arc::new(LoggingNodeMiddleware));
    }
    graph.add_node(PROMPT_NODE, Arc::new(PromptNode::new(options.system_prompt)));
    graph.add_node(MODEL_NODE, Arc::new(ModelNode::new(llm, registry.clone())));
    graph.add_node(TOOLS_NODE, Arc::new(ToolsNode::new(registry)));
    graph.add_edge(START, PROMPT_NODE);
    graph.add_edge(PROMPT_NODE, MODEL_NODE);
    graph.add_conditional_edges(MODEL_NODE, route_after_model, [TOOLS_NODE, END]);
    graph.add_edge(TOOLS_NODE, MODEL_NODE);
    graph.compile()
}
