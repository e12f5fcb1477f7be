//! chatgraph-cli library: env configuration, OpenAI-compatible provider
//! adapters and reusable run logic.
//!
//! Reads provider config from .env, builds the prompt → model ⇄ tools graph
//! over the built-in tools, runs one turn and returns the final state.
//!
//! ## Usage
//!
//! ```rust,no_run,ignore
//! let state = chatgraph_cli::run("What is 17 * 23?").await?;
//! println!("{}", state.last_assistant_reply().unwrap_or_default());
//! ```

mod config;
mod llm;
mod run;
mod speech;
mod tools;

pub use chatgraph::{ConversationState, Message, Role};
pub use config::{Error, RunConfig, RunOptions};
pub use llm::{parse_message, ChatOpenAICompat};
pub use run::{run, run_voice_with_config, run_with_config, run_with_options};
pub use speech::OpenAiSpeech;
pub use tools::default_registry;

#[cfg(test)]
mod tests;
