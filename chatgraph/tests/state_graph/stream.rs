//! CompiledGraph::stream and cancellation via RunContext.

use std::sync::Arc;

use async_trait::async_trait;
use chatgraph::{
    AgentError, ConversationState, Node, RunContext, RunError, StateGraph, StateUpdate,
    StreamEvent, StreamMode, START,
};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::common::{echo_node, pass_node, user_state};

#[tokio::test]
async fn stream_emits_updates_then_values_per_node() {
    let mut graph = StateGraph::new();
    graph.add_node("first", pass_node("first"));
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "echo");
    let compiled = graph.compile().unwrap();

    let events: Vec<StreamEvent> = compiled
        .stream(user_state("hi"), [StreamMode::Updates])
        .collect()
        .await;
    let nodes: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Updates { node_id, .. } => Some(node_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(nodes, vec!["first".to_string(), "echo".to_string()]);
}

struct Hang;

#[async_trait]
impl Node for Hang {
    fn id(&self) -> &str {
        "hang"
    }

    fn can_complete_turn(&self) -> bool {
        true
    }

    async fn run(&self, _state: &ConversationState) -> Result<StateUpdate, AgentError> {
        std::future::pending::<()>().await;
        Ok(StateUpdate::new())
    }
}

/// **Scenario**: cancelling the token aborts a node that never returns.
#[tokio::test]
async fn cancellation_interrupts_running_node() {
    let mut graph = StateGraph::new();
    graph.add_node("hang", Arc::new(Hang));
    graph.add_edge(START, "hang");
    let compiled = graph.compile().unwrap();

    let cancel = CancellationToken::new();
    let ctx = RunContext::new().with_cancellation(cancel.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel.cancel();
    });
    let result = compiled.run_with_context(user_state("x"), &ctx).await;
    canceller.await.unwrap();
    assert!(matches!(result, Err(RunError::Cancelled)));
}
