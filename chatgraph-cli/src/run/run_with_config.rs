//! Runs with a given config against the configured provider; does not read .env.

use std::sync::Arc;

use chatgraph::modes::{AudioClip, SpeechServices, VoiceReply};
use chatgraph::ConversationState;

use crate::config::RunConfig;
use crate::llm::ChatOpenAICompat;
use crate::speech::OpenAiSpeech;

use super::common::{build_engine, run_text_turn, run_voice_turn};
use super::Error;

/// Runs one text turn with the given config; returns the final state.
pub async fn run_with_config(
    config: &RunConfig,
    user_message: &str,
) -> Result<ConversationState, Error> {
    let engine = build_engine(Arc::new(ChatOpenAICompat::from_config(config)), config)?;
    run_text_turn(engine, user_message).await
}

/// Transcribes `clip`, runs one turn and synthesizes the reply.
pub async fn run_voice_with_config(
    config: &RunConfig,
    clip: AudioClip,
) -> Result<(ConversationState, VoiceReply), Error> {
    let engine = build_engine(Arc::new(ChatOpenAICompat::from_config(config)), config)?;
    let speech = SpeechServices::from_provider(Arc::new(OpenAiSpeech::from_config(config)));
    run_voice_turn(engine, speech, clip).await
}
