//! Shared run logic: build the engine and drive one turn.
//!
//! Used by [`run_with_config`](super::run_with_config) and by tests that
//! inject `MockLlm` / `MockSpeech`.

use std::sync::Arc;

use chatgraph::llm::LlmClient;
use chatgraph::modes::{
    AudioClip, SpeechServices, TextHandler, TurnHandler, VoiceHandler, VoiceReply,
};
use chatgraph::{ChatEngine, ConversationState};
use tracing::warn;

use crate::config::RunConfig;
use crate::tools::default_registry;

use super::Error;

/// Engine over the default tool catalog with graph options from `config`.
pub(crate) fn build_engine(llm: Arc<dyn LlmClient>, config: &RunConfig) -> Result<ChatEngine, Error> {
    let registry = default_registry()?;
    let engine = ChatEngine::from_llm(llm, Arc::new(registry), config.graph_options())?;
    Ok(engine)
}

/// One text turn in a fresh conversation; returns the final state.
pub(crate) async fn run_text_turn(
    engine: ChatEngine,
    user_message: &str,
) -> Result<ConversationState, Error> {
    let handler = TextHandler::new(engine);
    let mut state = handler.build_initial_state();
    handler.handle(&mut state, user_message.to_string()).await?;
    log_tool_errors(&state);
    Ok(state)
}

/// One voice turn in a fresh conversation.
pub(crate) async fn run_voice_turn(
    engine: ChatEngine,
    speech: SpeechServices,
    clip: AudioClip,
) -> Result<(ConversationState, VoiceReply), Error> {
    let handler = VoiceHandler::new(engine, speech);
    let mut state = handler.build_initial_state();
    let reply = handler.handle(&mut state, clip).await?;
    log_tool_errors(&state);
    Ok((state, reply))
}

fn log_tool_errors(state: &ConversationState) {
    for e in chatgraph::modes::tool_errors_of(state) {
        warn!(tool = %e.tool, call_id = %e.call_id, cause = %e.cause, "tool failed during turn");
    }
}
