//! Node middleware wraps every node run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chatgraph::graph::NodeRunFn;
use chatgraph::{AgentError, ConversationState, Message, NodeMiddleware, StateGraph, StateUpdate, START};

use crate::common::{echo_node, pass_node, user_state};

#[derive(Default)]
struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl NodeMiddleware for Counting {
    async fn around_run(
        &self,
        _node_id: &str,
        state: ConversationState,
        inner: NodeRunFn,
    ) -> Result<StateUpdate, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        inner(state).await
    }
}

#[tokio::test]
async fn middleware_sees_every_node() {
    let counting = Arc::new(Counting::default());
    let mut graph = StateGraph::new().with_middleware(counting.clone());
    graph.add_node("first", pass_node("first"));
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "echo");
    let out = graph.compile().unwrap().run(user_state("hi")).await.unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    assert_eq!(out.last_assistant_reply(), Some("hi"));
}

struct Replace;

#[async_trait]
impl NodeMiddleware for Replace {
    async fn around_run(
        &self,
        node_id: &str,
        _state: ConversationState,
        _inner: NodeRunFn,
    ) -> Result<StateUpdate, AgentError> {
        Ok(StateUpdate::new()
            .message(Message::assistant(format!("replaced {}", node_id)))
            .complete_turn())
    }
}

/// **Scenario**: middleware may skip the node and substitute its own update.
#[tokio::test]
async fn middleware_can_replace_node_result() {
    let mut graph = StateGraph::new().with_middleware(Arc::new(Replace));
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "echo");
    let out = graph.compile().unwrap().run(user_state("hi")).await.unwrap();
    assert_eq!(out.last_assistant_reply(), Some("replaced echo"));
}
