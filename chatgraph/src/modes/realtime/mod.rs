//! Realtime channel: a persistent duplex session over PCM16 audio frames.
//!
//! The session task owns the committed [`ConversationState`] and is its only
//! writer. Audio is segmented into utterances by [`EnergyVad`]; each
//! utterance (or text message) runs the graph on its own task with a child
//! cancellation token, and reports back over a channel tagged with the
//! turn's generation number. Results from a turn that is no longer current
//! are dropped, so an interrupted turn never touches the committed state.
//!
//! ```text
//! inputs ─► session task ──spawn──► turn task (STT → graph → TTS)
//!              ▲   │                    │
//!              │   └─► events           │
//!              └──── TaskMsg{generation}┘
//! ```

mod vad;

pub use vad::{AudioFrame, EnergyVad, VadConfig, VadEvent, DEFAULT_SAMPLE_RATE};

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::ChatEngine;
use super::error::ModeError;
use super::speech::{AudioClip, SpeechServices};
use crate::graph::{RunContext, RunError};
use crate::message::Message;
use crate::state::{ConversationState, Mode, StateUpdate};
use crate::stream::{StreamEvent, StreamMode};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RealtimeConfig {
    pub vad: VadConfig,
    /// Capacity of the outbound event channel.
    pub event_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            event_buffer: 64,
        }
    }
}

/// Inbound message of a realtime session.
#[derive(Clone, Debug, PartialEq)]
pub enum RealtimeInput {
    Audio(AudioFrame),
    /// Typed message; skips transcription.
    Text(String),
    /// Cancel the in-flight turn, if any.
    Interrupt,
    /// Finish the in-flight turn and end the session.
    Close,
}

/// Outbound event of a realtime session.
#[derive(Clone, Debug, PartialEq)]
pub enum RealtimeEvent {
    SpeechStarted,
    SpeechEnded,
    UserTranscript(String),
    /// Assistant text as soon as the model produced it.
    AssistantText(String),
    AssistantAudio(AudioClip),
    TurnCompleted { reply: String },
    /// The in-flight turn was cancelled and its state discarded.
    TurnInterrupted,
    Error(String),
}

/// Starts realtime sessions over a shared engine.
#[derive(Clone)]
pub struct RealtimeHandler {
    engine: ChatEngine,
    speech: SpeechServices,
    config: RealtimeConfig,
}

impl RealtimeHandler {
    pub fn new(engine: ChatEngine, speech: SpeechServices) -> Self {
        Self {
            engine,
            speech,
            config: RealtimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RealtimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &ChatEngine {
        &self.engine
    }

    pub fn build_initial_state(&self) -> ConversationState {
        self.engine.start_conversation(Mode::Realtime)
    }

    /// Spawns the session task. Must be called within a Tokio runtime.
    pub fn start(&self, state: ConversationState) -> Result<RealtimeSession, ModeError> {
        if state.mode != Mode::Realtime {
            return Err(ModeError::ModeMismatch {
                expected: Mode::Realtime,
                actual: state.mode,
            });
        }
        let (input_tx, input_rx) = mpsc::channel(self.config.event_buffer.max(1));
        let (event_tx, event_rx) = mpsc::channel(self.config.event_buffer.max(1));
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        info!(session_id = ?state.session_id(), "realtime session started");

        let driver = SessionDriver {
            engine: self.engine.clone(),
            speech: self.speech.clone(),
            vad: EnergyVad::new(self.config.vad),
            sample_rate: self.config.vad.sample_rate,
            event_buffer: self.config.event_buffer.max(1),
            state,
            generation: 0,
            in_flight: None,
            root: CancellationToken::new(),
            events: event_tx,
            task_tx,
        };
        let handle = tokio::spawn(driver.run(input_rx, task_rx));
        Ok(RealtimeSession {
            input: input_tx,
            events: event_rx,
            driver: handle,
        })
    }
}

/// Caller side of a running session.
///
/// Outbound events go through a bounded channel of
/// [`RealtimeConfig::event_buffer`] slots. The driver waits when it is full, so
/// a caller streaming audio must keep reading [`next_event`](Self::next_event)
/// while it sends; otherwise `send_audio` eventually blocks too.
pub struct RealtimeSession {
    input: mpsc::Sender<RealtimeInput>,
    events: mpsc::Receiver<RealtimeEvent>,
    driver: JoinHandle<ConversationState>,
}

impl RealtimeSession {
    pub async fn send(&self, input: RealtimeInput) -> Result<(), ModeError> {
        self.input
            .send(input)
            .await
            .map_err(|_| ModeError::SessionClosed)
    }

    pub async fn send_audio(&self, frame: AudioFrame) -> Result<(), ModeError> {
        self.send(RealtimeInput::Audio(frame)).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), ModeError> {
        self.send(RealtimeInput::Text(text.into())).await
    }

    pub async fn interrupt(&self) -> Result<(), ModeError> {
        self.send(RealtimeInput::Interrupt).await
    }

    /// Next outbound event; `None` once the session ended.
    pub async fn next_event(&mut self) -> Option<RealtimeEvent> {
        self.events.recv().await
    }

    /// Waits for the in-flight turn, ends the session and returns the final
    /// state. Events not yet read are discarded.
    pub async fn close(self) -> Result<ConversationState, ModeError> {
        let RealtimeSession {
            input,
            mut events,
            driver,
        } = self;
        let _ = input.send(RealtimeInput::Close).await;
        drop(input);
        let drain = async { while events.recv().await.is_some() {} };
        let (joined, ()) = tokio::join!(driver, drain);
        joined.map_err(|e| {
            error!(error = %e, "realtime session task failed");
            ModeError::SessionClosed
        })
    }
}

/// What a turn task starts from.
enum TurnSource {
    /// The user message is already in the state.
    Text,
    Utterance(Vec<i16>),
}

enum TurnEnd {
    Completed {
        state: ConversationState,
        reply: String,
        audio: Option<AudioClip>,
        /// Set when the run failed and `state` carries the fallback reply.
        error: Option<String>,
    },
    Cancelled,
    NoSpeech,
    Error(String),
    Panicked,
}

enum TaskMsg {
    Transcript { generation: u64, text: String },
    AssistantText { generation: u64, text: String },
    Done { generation: u64, end: TurnEnd },
}

impl TaskMsg {
    fn generation(&self) -> u64 {
        match self {
            TaskMsg::Transcript { generation, .. }
            | TaskMsg::AssistantText { generation, .. }
            | TaskMsg::Done { generation, .. } => *generation,
        }
    }
}

struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

struct SessionDriver {
    engine: ChatEngine,
    speech: SpeechServices,
    vad: EnergyVad,
    sample_rate: u32,
    event_buffer: usize,
    state: ConversationState,
    generation: u64,
    in_flight: Option<InFlight>,
    root: CancellationToken,
    events: mpsc::Sender<RealtimeEvent>,
    task_tx: mpsc::UnboundedSender<TaskMsg>,
}

impl SessionDriver {
    async fn run(
        mut self,
        mut inputs: mpsc::Receiver<RealtimeInput>,
        mut tasks: mpsc::UnboundedReceiver<TaskMsg>,
    ) -> ConversationState {
        let mut closing = false;
        loop {
            if closing && self.in_flight.is_none() {
                break;
            }
            tokio::select! {
                input = inputs.recv(), if !closing => match input {
                    Some(RealtimeInput::Close) | None => {
                        closing = true;
                        if let Some(VadEvent::SpeechEnded(samples)) = self.vad.flush() {
                            self.emit(RealtimeEvent::SpeechEnded).await;
                            self.start_turn(TurnSource::Utterance(samples)).await;
                        }
                    }
                    Some(input) => self.on_input(input).await,
                },
                Some(msg) = tasks.recv() => self.on_task(msg).await,
                else => break,
            }
        }
        self.root.cancel();
        info!(session_id = ?self.state.session_id(), messages = self.state.messages.len(), "realtime session closed");
        self.state
    }

    async fn emit(&self, event: RealtimeEvent) {
        let _ = self.events.send(event).await;
    }

    async fn on_input(&mut self, input: RealtimeInput) {
        match input {
            RealtimeInput::Audio(frame) => {
                for event in self.vad.push(&frame) {
                    match event {
                        VadEvent::SpeechStarted => {
                            // barge-in
                            self.interrupt().await;
                            self.emit(RealtimeEvent::SpeechStarted).await;
                        }
                        VadEvent::SpeechEnded(samples) => {
                            self.emit(RealtimeEvent::SpeechEnded).await;
                            self.start_turn(TurnSource::Utterance(samples)).await;
                        }
                    }
                }
            }
            RealtimeInput::Text(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    self.emit(RealtimeEvent::Error(ModeError::EmptyInput.to_string()))
                        .await;
                    return;
                }
                self.interrupt().await;
                self.state
                    .apply(StateUpdate::new().message(Message::user(text.clone())));
                self.emit(RealtimeEvent::UserTranscript(text)).await;
                self.start_turn(TurnSource::Text).await;
            }
            RealtimeInput::Interrupt => self.interrupt().await,
            RealtimeInput::Close => {}
        }
    }

    /// Cancels the in-flight turn. Its later messages fail the generation check.
    async fn interrupt(&mut self) {
        if let Some(turn) = self.in_flight.take() {
            debug!(generation = turn.generation, "interrupting turn");
            turn.cancel.cancel();
            self.emit(RealtimeEvent::TurnInterrupted).await;
        }
    }

    async fn start_turn(&mut self, source: TurnSource) {
        self.interrupt().await;
        self.generation += 1;
        let generation = self.generation;
        let cancel = self.root.child_token();
        self.in_flight = Some(InFlight {
            generation,
            cancel: cancel.clone(),
        });
        debug!(generation, "turn started");

        let turn = TurnTask {
            engine: self.engine.clone(),
            speech: self.speech.clone(),
            sample_rate: self.sample_rate,
            event_buffer: self.event_buffer,
            generation,
            cancel,
            tx: self.task_tx.clone(),
        };
        let state = self.state.clone();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let end = AssertUnwindSafe(turn.run(state, source))
                .catch_unwind()
                .await
                .unwrap_or(TurnEnd::Panicked);
            let _ = tx.send(TaskMsg::Done { generation, end });
        });
    }

    async fn on_task(&mut self, msg: TaskMsg) {
        let current = self.in_flight.as_ref().map(|t| t.generation);
        if current != Some(msg.generation()) {
            return;
        }
        match msg {
            TaskMsg::Transcript { text, .. } => {
                self.state
                    .apply(StateUpdate::new().message(Message::user(text.clone())));
                self.emit(RealtimeEvent::UserTranscript(text)).await;
            }
            TaskMsg::AssistantText { text, .. } => {
                self.emit(RealtimeEvent::AssistantText(text)).await;
            }
            TaskMsg::Done { end, generation } => {
                self.in_flight = None;
                self.finish_turn(generation, end).await;
            }
        }
    }

    async fn finish_turn(&mut self, generation: u64, end: TurnEnd) {
        match end {
            TurnEnd::Completed {
                state,
                reply,
                audio,
                error,
            } => {
                self.state = state;
                if let Some(error) = error {
                    self.emit(RealtimeEvent::Error(error)).await;
                }
                if let Some(audio) = audio {
                    self.emit(RealtimeEvent::AssistantAudio(audio)).await;
                }
                self.emit(RealtimeEvent::TurnCompleted { reply }).await;
            }
            TurnEnd::Cancelled => debug!(generation, "turn cancelled"),
            TurnEnd::NoSpeech => debug!(generation, "utterance had no speech"),
            TurnEnd::Error(message) => {
                warn!(generation, error = %message, "turn failed before running the graph");
                self.emit(RealtimeEvent::Error(message)).await;
            }
            TurnEnd::Panicked => {
                error!(generation, "turn task panicked");
                self.emit(RealtimeEvent::Error("turn task panicked".to_string()))
                    .await;
            }
        }
    }
}

/// One utterance: STT, graph run and TTS, each abandoned on cancellation.
struct TurnTask {
    engine: ChatEngine,
    speech: SpeechServices,
    sample_rate: u32,
    event_buffer: usize,
    generation: u64,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<TaskMsg>,
}

impl TurnTask {
    async fn run(self, mut state: ConversationState, source: TurnSource) -> TurnEnd {
        if let TurnSource::Utterance(samples) = source {
            let clip = AudioClip::wav_from_pcm16(&samples, self.sample_rate);
            let transcript = tokio::select! {
                _ = self.cancel.cancelled() => return TurnEnd::Cancelled,
                r = self.speech.stt.transcribe(&clip) => r,
            };
            let text = match transcript {
                Ok(text) => text.trim().to_string(),
                Err(e) => return TurnEnd::Error(e.to_string()),
            };
            if text.is_empty() {
                return TurnEnd::NoSpeech;
            }
            let _ = self.tx.send(TaskMsg::Transcript {
                generation: self.generation,
                text: text.clone(),
            });
            state.apply(StateUpdate::new().message(Message::user(text)));
        }

        let pre_turn = state.clone();
        let (stream_tx, mut stream_rx) = mpsc::channel(self.event_buffer);
        let ctx = RunContext::new()
            .with_stream(stream_tx, [StreamMode::Messages])
            .with_cancellation(self.cancel.clone());
        let engine = &self.engine;
        let run = async move {
            let result = engine.try_run_turn(state, &ctx).await;
            drop(ctx);
            result
        };
        let forward = async {
            while let Some(event) = stream_rx.recv().await {
                if let StreamEvent::Messages { chunk, .. } = event {
                    let _ = self.tx.send(TaskMsg::AssistantText {
                        generation: self.generation,
                        text: chunk.content,
                    });
                }
            }
        };
        let (result, ()) = tokio::join!(run, forward);

        let (state, error) = match result {
            Ok(state) => (state, None),
            Err(RunError::Cancelled) => return TurnEnd::Cancelled,
            Err(e) => {
                let message = e.to_string();
                (self.engine.recover(pre_turn, &e), Some(message))
            }
        };

        let reply = state.turn_reply().unwrap_or_default().to_string();
        let audio = if reply.is_empty() {
            None
        } else {
            let synthesized = tokio::select! {
                _ = self.cancel.cancelled() => return TurnEnd::Cancelled,
                r = self.speech.tts.synthesize(&reply) => r,
            };
            match synthesized {
                Ok(clip) => Some(clip),
                Err(e) => {
                    warn!(error = %e, "speech synthesis failed; sending text only");
                    None
                }
            }
        };
        TurnEnd::Completed {
            state,
            reply,
            audio,
            error,
        }
    }
}
