//! Run context passed into nodes for streaming-aware, cancellable execution.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::stream::{StreamEvent, StreamMode};

/// Per-run context: optional stream sender, selected stream modes and a
/// cancellation token checked between and during node runs.
#[derive(Clone, Default)]
pub struct RunContext {
    /// Optional sender for streaming events.
    pub stream_tx: Option<mpsc::Sender<StreamEvent>>,
    /// Enabled stream modes (Values, Updates, Messages, Custom).
    pub stream_mode: HashSet<StreamMode>,
    /// Cancelling this token aborts the run with `RunError::Cancelled`.
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(
        mut self,
        tx: mpsc::Sender<StreamEvent>,
        modes: impl IntoIterator<Item = StreamMode>,
    ) -> Self {
        self.stream_tx = Some(tx);
        self.stream_mode = modes.into_iter().collect();
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// True when a sender is attached and `mode` is enabled.
    pub fn streams(&self, mode: StreamMode) -> bool {
        self.stream_tx.is_some() && self.stream_mode.contains(&mode)
    }

    /// Sends `event` when `mode` is enabled. A dropped receiver is ignored.
    pub async fn emit(&self, mode: StreamMode, event: StreamEvent) {
        if !self.stream_mode.contains(&mode) {
            return;
        }
        if let Some(tx) = &self.stream_tx {
            let _ = tx.send(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_respects_enabled_modes() {
        let (tx, mut rx) = mpsc::channel(4);
        let ctx = RunContext::new().with_stream(tx, [StreamMode::Custom]);
        assert!(ctx.streams(StreamMode::Custom));
        assert!(!ctx.streams(StreamMode::Values));

        ctx.emit(StreamMode::Values, StreamEvent::Custom(serde_json::json!(1)))
            .await;
        ctx.emit(StreamMode::Custom, StreamEvent::Custom(serde_json::json!(2)))
            .await;
        drop(ctx);
        match rx.recv().await {
            Some(StreamEvent::Custom(v)) => assert_eq!(v, 2),
            other => panic!("expected Custom(2), got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }
}
