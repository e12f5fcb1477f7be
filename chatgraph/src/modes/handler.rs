//! The capability contract every turn-based channel implements.

use async_trait::async_trait;

use super::engine::ChatEngine;
use super::error::ModeError;
use crate::state::{ConversationState, Mode, StateUpdate};

/// One channel's `ingest → run_turn → emit` cycle over the shared engine.
///
/// Implementors only describe how channel input becomes a state update and
/// how the final state becomes channel output; `handle` drives the cycle.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    /// Channel-native input (text, an audio clip).
    type Input: Send;
    /// Channel-native output.
    type Output: Send;

    fn mode(&self) -> Mode;

    fn engine(&self) -> &ChatEngine;

    fn build_initial_state(&self) -> ConversationState {
        self.engine().start_conversation(self.mode())
    }

    /// Turns raw input into the update that opens the turn.
    async fn ingest(&self, input: Self::Input) -> Result<StateUpdate, ModeError>;

    async fn run_turn(&self, state: ConversationState) -> ConversationState {
        self.engine().run_turn(state).await
    }

    /// Renders the finished turn for the channel.
    async fn emit(&self, state: &ConversationState) -> Result<Self::Output, ModeError>;

    /// Runs one full turn. `state` is only replaced once the turn finished;
    /// an ingest failure leaves it untouched.
    async fn handle(
        &self,
        state: &mut ConversationState,
        input: Self::Input,
    ) -> Result<Self::Output, ModeError> {
        if state.mode != self.mode() {
            return Err(ModeError::ModeMismatch {
                expected: self.mode(),
                actual: state.mode,
            });
        }
        let update = self.ingest(input).await?;
        let mut next = state.clone();
        next.apply(update);
        let next = self.run_turn(next).await;
        let output = self.emit(&next).await;
        *state = next;
        output
    }
}
