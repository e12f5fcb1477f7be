//! Voice channel: an audio clip in; transcript, reply text and synthesized
//! audio out.
//!
//! Transcription happens in `ingest` and synthesis in `emit`, so the graph
//! only ever sees text.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::engine::ChatEngine;
use super::error::ModeError;
use super::handler::TurnHandler;
use super::speech::{AudioClip, SpeechServices};
use crate::message::Message;
use crate::state::{ConversationState, Mode, StateUpdate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceReply {
    /// What the user said, as transcribed.
    pub transcript: String,
    pub text: String,
    /// `None` when synthesis failed or the reply was empty.
    pub audio: Option<AudioClip>,
}

#[derive(Clone)]
pub struct VoiceHandler {
    engine: ChatEngine,
    speech: SpeechServices,
}

impl VoiceHandler {
    pub fn new(engine: ChatEngine, speech: SpeechServices) -> Self {
        Self { engine, speech }
    }

    pub fn speech(&self) -> &SpeechServices {
        &self.speech
    }

    /// Transcribes `clip`; whitespace-only transcripts count as empty.
    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String, ModeError> {
        if clip.is_empty() {
            return Err(ModeError::EmptyInput);
        }
        let transcript = self.speech.stt.transcribe(clip).await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(ModeError::EmptyTranscription);
        }
        debug!(chars = transcript.len(), "transcribed audio");
        Ok(transcript.to_string())
    }
}

#[async_trait]
impl TurnHandler for VoiceHandler {
    type Input = AudioClip;
    type Output = VoiceReply;

    fn mode(&self) -> Mode {
        Mode::Voice
    }

    fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    async fn ingest(&self, input: AudioClip) -> Result<StateUpdate, ModeError> {
        let transcript = self.transcribe(&input).await?;
        Ok(StateUpdate::new().message(Message::user(transcript)))
    }

    async fn emit(&self, state: &ConversationState) -> Result<VoiceReply, ModeError> {
        let transcript = state.last_user_message().unwrap_or_default().to_string();
        let text = state.turn_reply().unwrap_or_default().to_string();
        let audio = if text.is_empty() {
            None
        } else {
            match self.speech.tts.synthesize(&text).await {
                Ok(clip) => Some(clip),
                Err(e) => {
                    warn!(error = %e, "speech synthesis failed; replying with text only");
                    None
                }
            }
        };
        Ok(VoiceReply {
            transcript,
            text,
            audio,
        })
    }
}
