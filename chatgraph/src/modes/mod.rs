//! Mode handlers: adapt one channel's input and output to the shared graph.
//!
//! Text and voice are turn-based ([`TurnHandler`]); realtime holds a duplex
//! session and drives the graph once per detected utterance
//! ([`RealtimeHandler`]). All three share one [`ChatEngine`], so the graph
//! and the registry never learn which channel a conversation uses.

mod engine;
mod error;
mod handler;
pub mod realtime;
pub mod speech;
mod text;
mod voice;

pub use engine::{tool_errors_of, ChatEngine, TurnReport};
pub use error::ModeError;
pub use handler::TurnHandler;
pub use realtime::{
    AudioFrame, RealtimeConfig, RealtimeEvent, RealtimeHandler, RealtimeInput, RealtimeSession,
};
pub use speech::{
    AudioClip, AudioFormat, MockSpeech, SpeechError, SpeechServices, SpeechToText, TextToSpeech,
};
pub use text::{TextHandler, TextReply};
pub use voice::{VoiceHandler, VoiceReply};

use crate::message::Message;
use crate::state::{ConversationState, Mode, StateUpdate};

/// Channel-native input for [`ModeHandler::handle_turn`].
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelInput {
    Text(String),
    Audio(AudioClip),
}

/// Channel-native output of one turn.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelOutput {
    Text(TextReply),
    Voice(VoiceReply),
}

impl ChannelOutput {
    /// Reply text regardless of channel.
    pub fn text(&self) -> &str {
        match self {
            ChannelOutput::Text(reply) => &reply.text,
            ChannelOutput::Voice(reply) => &reply.text,
        }
    }
}

/// The handler variant for one conversation, selected by its [`Mode`].
#[derive(Clone)]
pub enum ModeHandler {
    Text(TextHandler),
    Voice(VoiceHandler),
    Realtime(RealtimeHandler),
}

impl ModeHandler {
    /// Picks the variant for `mode`. Text needs no speech services.
    pub fn for_mode(mode: Mode, engine: ChatEngine, speech: SpeechServices) -> Self {
        match mode {
            Mode::Text => ModeHandler::Text(TextHandler::new(engine)),
            Mode::Voice => ModeHandler::Voice(VoiceHandler::new(engine, speech)),
            Mode::Realtime => ModeHandler::Realtime(RealtimeHandler::new(engine, speech)),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            ModeHandler::Text(_) => Mode::Text,
            ModeHandler::Voice(_) => Mode::Voice,
            ModeHandler::Realtime(_) => Mode::Realtime,
        }
    }

    pub fn build_initial_state(&self) -> ConversationState {
        match self {
            ModeHandler::Text(h) => h.build_initial_state(),
            ModeHandler::Voice(h) => h.build_initial_state(),
            ModeHandler::Realtime(h) => h.build_initial_state(),
        }
    }

    /// One turn for turn-based variants. Voice also accepts typed text.
    pub async fn handle_turn(
        &self,
        state: &mut ConversationState,
        input: ChannelInput,
    ) -> Result<ChannelOutput, ModeError> {
        match (self, input) {
            (ModeHandler::Text(h), ChannelInput::Text(text)) => {
                h.handle(state, text).await.map(ChannelOutput::Text)
            }
            (ModeHandler::Voice(h), ChannelInput::Audio(clip)) => {
                h.handle(state, clip).await.map(ChannelOutput::Voice)
            }
            (ModeHandler::Voice(h), ChannelInput::Text(text)) => {
                if state.mode != Mode::Voice {
                    return Err(ModeError::ModeMismatch {
                        expected: Mode::Voice,
                        actual: state.mode,
                    });
                }
                let text = text.trim();
                if text.is_empty() {
                    return Err(ModeError::EmptyInput);
                }
                let mut next = state.clone();
                next.apply(StateUpdate::new().message(Message::user(text)));
                let next = h.run_turn(next).await;
                let output = h.emit(&next).await;
                *state = next;
                output.map(ChannelOutput::Voice)
            }
            (ModeHandler::Text(_), ChannelInput::Audio(_)) => {
                Err(ModeError::UnsupportedInput { mode: Mode::Text })
            }
            (ModeHandler::Realtime(_), _) => Err(ModeError::NotTurnBased(Mode::Realtime)),
        }
    }
}
