//! Channel adaptation errors.

use thiserror::Error;

use super::speech::SpeechError;
use crate::state::Mode;

/// Failure to turn channel input into a turn, or a turn into channel output.
///
/// Raised before or after the graph runs; graph failures themselves are
/// recovered by `ChatEngine::run_turn` and never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModeError {
    #[error("empty input")]
    EmptyInput,

    #[error("Could not transcribe audio")]
    EmptyTranscription,

    #[error("mode mismatch: handler is {expected}, conversation is {actual}")]
    ModeMismatch { expected: Mode, actual: Mode },

    #[error("unsupported input for {mode} mode")]
    UnsupportedInput { mode: Mode },

    /// Realtime conversations are driven by a session, not by single turns.
    #[error("{0} mode is not turn-based; start a session instead")]
    NotTurnBased(Mode),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("realtime session closed")]
    SessionClosed,
}
