//! CompiledGraph::run: output, routing and limits.

use chatgraph::{Role, RunError, StateGraph, END, START};

use crate::common::{echo_node, pass_node, tagging_node, user_state};

#[tokio::test]
async fn run_linear_chain_reaches_terminal_node() {
    let mut graph = StateGraph::new();
    graph.add_node("first", pass_node("first"));
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "echo");
    graph.add_edge("echo", END);
    let compiled = graph.compile().unwrap();

    let out = compiled.run(user_state("hello")).await.unwrap();
    assert!(out.turn_complete);
    assert_eq!(out.messages.len(), 2);
    assert_eq!(out.messages[1].role, Role::Assistant);
    assert_eq!(out.messages[1].content, "hello");
}

/// **Scenario**: a router returning a name outside its declared targets fails the run.
#[tokio::test]
async fn undeclared_route_target_is_a_routing_error() {
    let mut graph = StateGraph::new();
    graph.add_node("a", tagging_node("a"));
    graph.add_node("b", tagging_node("b"));
    graph.add_edge(START, "a");
    graph.add_conditional_edges("a", |_| "c".to_string(), ["b", END]);
    let compiled = graph.compile().unwrap();

    match compiled.run(user_state("x")).await {
        Err(RunError::Routing { from, target }) => {
            assert_eq!(from, "a");
            assert_eq!(target, "c");
        }
        other => panic!("expected Routing, got {:?}", other),
    }
}

#[tokio::test]
async fn routing_to_end_stops_without_turn_complete_flag() {
    let mut graph = StateGraph::new();
    graph.add_node("a", tagging_node("a"));
    graph.add_edge(START, "a");
    graph.add_conditional_edges("a", |_| END.to_string(), [END]);
    let out = graph.compile().unwrap().run(user_state("x")).await.unwrap();
    assert_eq!(out.last_assistant_reply(), Some("a"));
}

#[tokio::test]
async fn turn_complete_is_reset_between_runs() {
    let mut graph = StateGraph::new();
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "echo");
    let compiled = graph.compile().unwrap();

    let mut state = compiled.run(user_state("one")).await.unwrap();
    assert!(state.turn_complete);
    state.messages.push(chatgraph::Message::user("two"));
    let state = compiled.run(state).await.unwrap();
    assert_eq!(state.last_assistant_reply(), Some("two"));
    assert_eq!(state.messages.len(), 4);
}
