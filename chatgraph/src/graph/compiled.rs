//! Compiled graph: immutable, runs one turn per call.
//!
//! Built by `StateGraph::compile`. Starting at the entry node, the executor
//! runs a node, applies its update, then resolves the successor over the
//! post-update state. It stops when `turn_complete` is set, when the node has
//! no successor (or routes to `END`), and fails when the step limit is exceeded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::AgentError;
use crate::state::{ConversationState, StateUpdate};
use crate::stream::{StreamEvent, StreamMode};

use super::config::GraphConfig;
use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_state_update,
};
use super::node::Node;
use super::node_middleware::{NodeFuture, NodeMiddleware};
use super::state_graph::{Successor, END};
use super::{RunContext, RunError};

/// Compiled graph: immutable structure, cheap to clone, safe to share between
/// concurrent conversations.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(super) nodes: HashMap<String, Arc<dyn Node>>,
    pub(super) order: Vec<String>,
    pub(super) successors: HashMap<String, Successor>,
    pub(super) entry: String,
    pub(super) middleware: Option<Arc<dyn NodeMiddleware>>,
    pub(super) config: GraphConfig,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.entry)
            .field("nodes", &self.order)
            .field("successors", &self.successors)
            .field("config", &self.config)
            .finish()
    }
}

/// Where to go after a node.
enum Step {
    Next(String),
    Stop,
}

impl CompiledGraph {
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Node ids in declaration order.
    pub fn node_ids(&self) -> &[String] {
        &self.order
    }

    pub fn successor(&self, node_id: &str) -> Option<&Successor> {
        self.successors.get(node_id)
    }

    pub fn config(&self) -> GraphConfig {
        self.config
    }

    /// Runs one turn and returns the final state.
    ///
    /// On error the partially updated state is dropped; the caller still owns
    /// whatever it cloned before the call.
    pub async fn run(&self, state: ConversationState) -> Result<ConversationState, RunError> {
        self.run_with_context(state, &RunContext::default()).await
    }

    /// Like `run`, with streaming and cancellation from `ctx`.
    pub async fn run_with_context(
        &self,
        state: ConversationState,
        ctx: &RunContext,
    ) -> Result<ConversationState, RunError> {
        let mut state = state;
        match self.run_loop(&mut state, ctx).await {
            Ok(()) => Ok(state),
            Err(e) => {
                log_graph_error(&e);
                Err(e)
            }
        }
    }

    /// Runs the turn on a background task and streams events for `modes`.
    /// A failed run ends the stream with `StreamEvent::Failed`.
    pub fn stream(
        &self,
        state: ConversationState,
        modes: impl IntoIterator<Item = StreamMode>,
    ) -> ReceiverStream<StreamEvent> {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let mode_set: HashSet<StreamMode> = modes.into_iter().collect();

        tokio::spawn(async move {
            let ctx = RunContext {
                stream_tx: Some(tx.clone()),
                stream_mode: mode_set,
                ..Default::default()
            };
            if let Err(e) = graph.run_with_context(state, &ctx).await {
                let _ = tx
                    .send(StreamEvent::Failed {
                        error: e.to_string(),
                    })
                    .await;
            }
        });

        ReceiverStream::new(rx)
    }

    async fn run_loop(&self, state: &mut ConversationState, ctx: &RunContext) -> Result<(), RunError> {
        state.turn_complete = false;
        log_graph_start(&self.entry, state.messages.len());

        let mut current = self.entry.clone();
        let mut steps = 0usize;
        loop {
            if steps >= self.config.max_steps {
                return Err(RunError::StepLimit {
                    max_steps: self.config.max_steps,
                });
            }
            if ctx.cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }
            steps += 1;

            let node = self
                .nodes
                .get(&current)
                .cloned()
                .ok_or_else(|| RunError::Routing {
                    from: current.clone(),
                    target: current.clone(),
                })?;
            log_node_start(&current, steps);

            let result = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(RunError::Cancelled),
                result = self.run_node(&current, node, state, ctx) => result,
            };
            let update = result.map_err(|source| RunError::NodeFailed {
                node_id: current.clone(),
                source,
            })?;

            log_state_update(&current, &update);
            let streamed_update = ctx.streams(StreamMode::Updates).then(|| update.clone());
            state.apply(update);

            if ctx.streams(StreamMode::Values) {
                ctx.emit(StreamMode::Values, StreamEvent::Values(state.clone()))
                    .await;
            }
            if let Some(update) = streamed_update {
                ctx.emit(
                    StreamMode::Updates,
                    StreamEvent::Updates {
                        node_id: current.clone(),
                        update,
                    },
                )
                .await;
            }

            let step = if state.turn_complete {
                Step::Stop
            } else {
                self.resolve_next(&current, state)?
            };
            match step {
                Step::Next(next) => {
                    log_node_complete(&current, Some(&next));
                    current = next;
                }
                Step::Stop => {
                    log_node_complete(&current, None);
                    log_graph_complete(steps, state.turn_complete);
                    return Ok(());
                }
            }
        }
    }

    async fn run_node(
        &self,
        node_id: &str,
        node: Arc<dyn Node>,
        state: &ConversationState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, AgentError> {
        match &self.middleware {
            Some(middleware) => {
                let ctx = ctx.clone();
                middleware
                    .around_run(
                        node_id,
                        state.clone(),
                        Box::new(move |s: ConversationState| -> NodeFuture {
                            Box::pin(async move { node.run_with_context(&s, &ctx).await })
                        }),
                    )
                    .await
            }
            None => node.run_with_context(state, ctx).await,
        }
    }

    fn resolve_next(&self, current: &str, state: &ConversationState) -> Result<Step, RunError> {
        let next = match self.successors.get(current) {
            None => return Ok(Step::Stop),
            Some(Successor::Static(to)) => to.clone(),
            Some(Successor::Conditional { router, targets }) => {
                let target = router(state);
                if !targets.iter().any(|t| *t == target) {
                    return Err(RunError::Routing {
                        from: current.to_string(),
                        target,
                    });
                }
                target
            }
        };
        if next == END {
            Ok(Step::Stop)
        } else {
            Ok(Step::Next(next))
        }
    }
}
