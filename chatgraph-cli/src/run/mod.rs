//! Run entry points: run with default config, run_with_config, or run_with_options.

pub use crate::config::Error;

pub(crate) mod common;
mod run_with_config;

use chatgraph::ConversationState;

use crate::config::{RunConfig, RunOptions};

pub use run_with_config::{run_voice_with_config, run_with_config};

/// Runs one text turn with config from env (and .env); returns the final state.
pub async fn run(user_message: &str) -> Result<ConversationState, Error> {
    dotenv::dotenv().ok();
    let config = RunConfig::from_env()?;
    run_with_config(&config, user_message).await
}

/// Like [`run`], with `options` applied on top of the env config.
pub async fn run_with_options(
    user_message: &str,
    options: &RunOptions,
) -> Result<ConversationState, Error> {
    dotenv::dotenv().ok();
    let mut config = RunConfig::from_env()?;
    config.apply_options(options);
    run_with_config(&config, user_message).await
}
