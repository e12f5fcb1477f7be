//! StateGraph compile failure cases: unknown nodes, missing start, unguarded cycles.

use chatgraph::graph::FnNode;
use chatgraph::{GraphValidationError, StateGraph, StateUpdate, END, START};
use std::sync::Arc;

use crate::common::{echo_node, pass_node};

#[test]
fn compile_fails_when_edge_refers_to_unknown_node() {
    let mut graph = StateGraph::new();
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "echo");
    graph.add_edge("echo", "missing");

    match graph.compile() {
        Err(GraphValidationError::NodeNotFound(id)) => assert_eq!(id, "missing"),
        other => panic!("expected NodeNotFound, got {:?}", other.err()),
    }
}

#[test]
fn compile_fails_without_start() {
    let mut graph = StateGraph::new();
    graph.add_node("echo", echo_node("echo"));
    assert_eq!(
        graph.compile().err(),
        Some(GraphValidationError::MissingStart)
    );
}

#[test]
fn compile_fails_when_start_is_not_a_node() {
    let mut graph = StateGraph::new();
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "nowhere");
    assert_eq!(
        graph.compile().err(),
        Some(GraphValidationError::StartNotDeclared("nowhere".into()))
    );
}

#[test]
fn compile_fails_on_duplicate_node() {
    let mut graph = StateGraph::new();
    graph.add_node("echo", echo_node("echo"));
    graph.add_node("echo", echo_node("echo"));
    graph.add_edge(START, "echo");
    assert_eq!(
        graph.compile().err(),
        Some(GraphValidationError::DuplicateNode("echo".into()))
    );
}

#[test]
fn compile_fails_on_empty_route_targets() {
    let mut graph = StateGraph::new();
    graph.add_node("a", echo_node("a"));
    graph.add_edge(START, "a");
    graph.add_conditional_edges("a", |_| END.to_string(), Vec::<String>::new());
    assert_eq!(
        graph.compile().err(),
        Some(GraphValidationError::EmptyRouteTargets("a".into()))
    );
}

/// **Scenario**: a cycle where no node can complete the turn is rejected;
/// the same cycle with one completing node builds.
#[test]
fn unguarded_cycle_rejected_guarded_cycle_accepted() {
    let mut graph = StateGraph::new();
    graph.add_node("a", pass_node("a"));
    graph.add_node("b", pass_node("b"));
    graph.add_edge(START, "a");
    graph.add_edge("a", "b");
    graph.add_conditional_edges("b", |_| "a".to_string(), ["a", END]);
    assert!(matches!(
        graph.compile(),
        Err(GraphValidationError::UnguardedCycle(_))
    ));

    let mut graph = StateGraph::new();
    graph.add_node("a", pass_node("a"));
    graph.add_node("b", echo_node("b"));
    graph.add_edge(START, "a");
    graph.add_edge("a", "b");
    graph.add_conditional_edges("b", |_| "a".to_string(), ["a", END]);
    assert!(graph.compile().is_ok());
}

#[test]
fn tool_emitter_must_reach_a_resolver() {
    let mut graph = StateGraph::new();
    graph.add_node(
        "model",
        Arc::new(
            FnNode::new("model", |_| StateUpdate::new().complete_turn())
                .can_complete()
                .emitting_tool_calls(),
        ),
    );
    graph.add_edge(START, "model");
    graph.add_edge("model", END);
    assert_eq!(
        graph.compile().err(),
        Some(GraphValidationError::UnresolvedToolCalls("model".into()))
    );
}
