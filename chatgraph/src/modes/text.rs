//! Text channel: a string in, the assistant's reply out.

use async_trait::async_trait;

use super::engine::ChatEngine;
use super::error::ModeError;
use super::handler::TurnHandler;
use crate::message::Message;
use crate::state::{ConversationState, Mode, StateUpdate};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextReply {
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct TextHandler {
    engine: ChatEngine,
}

impl TextHandler {
    pub fn new(engine: ChatEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl TurnHandler for TextHandler {
    type Input = String;
    type Output = TextReply;

    fn mode(&self) -> Mode {
        Mode::Text
    }

    fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    async fn ingest(&self, input: String) -> Result<StateUpdate, ModeError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ModeError::EmptyInput);
        }
        Ok(StateUpdate::new().message(Message::user(text)))
    }

    async fn emit(&self, state: &ConversationState) -> Result<TextReply, ModeError> {
        Ok(TextReply {
            text: state.turn_reply().unwrap_or_default().to_string(),
        })
    }
}
