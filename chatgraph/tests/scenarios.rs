//! End-to-end conversation scenarios over the model ⇄ tools graph and
//! hand-built graphs: tool round trips, unknown tools, determinism, history
//! growth and step limits.

use std::sync::Arc;

use chatgraph::graph::FnNode;
use chatgraph::nodes::{route_after_model, MODEL_NODE, TOOLS_NODE};
use chatgraph::tools::builtin::register_builtin_tools;
use chatgraph::{
    build_chat_graph, ChatGraphOptions, CompiledGraph, ConversationState, Message, MockLlm, Mode,
    PendingUpdate, Role, RunError, StateGraph, StateUpdate, StreamEvent, StreamMode, ToolCall,
    ToolRegistry, END, START,
};
use serde_json::json;
use tokio_stream::StreamExt;

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry).unwrap();
    Arc::new(registry)
}

fn chat_graph(llm: MockLlm) -> CompiledGraph {
    build_chat_graph(Arc::new(llm), registry(), ChatGraphOptions::default()).unwrap()
}

fn text_state(user: &str) -> ConversationState {
    let mut state = ConversationState::with_system_prompt(Mode::Text, "You are helpful.");
    state.messages.push(Message::user(user));
    state
}

/// **Scenario A**: classify → respond with no tool needed appends exactly one
/// assistant message and completes the turn.
#[tokio::test]
async fn scenario_a_no_tool_single_reply() {
    let mut graph = StateGraph::new();
    graph.add_node(
        "classify",
        Arc::new(FnNode::new("classify", |_| {
            StateUpdate::new().meta("intent", "arithmetic")
        })),
    );
    graph.add_node(
        "respond",
        Arc::new(
            FnNode::new("respond", |_| {
                StateUpdate::new()
                    .message(Message::assistant("4"))
                    .complete_turn()
            })
            .can_complete(),
        ),
    );
    graph.add_edge(START, "classify");
    graph.add_conditional_edges("classify", |_| "respond".to_string(), ["respond", END]);
    let compiled = graph.compile().unwrap();

    let mut initial = ConversationState::new(Mode::Text);
    initial.messages.push(Message::user("2+2?"));
    let out = compiled.run(initial.clone()).await.unwrap();

    assert_eq!(out.messages.len(), initial.messages.len() + 1);
    assert_eq!(out.messages.last().unwrap().role, Role::Assistant);
    assert!(out.turn_complete);
    assert_eq!(out.metadata.get("intent"), Some(&json!("arithmetic")));
}

/// **Scenario B**: a calculate call is queued, resolved into a tool message
/// containing "4", then answered; nothing is pending at turn end.
#[tokio::test]
async fn scenario_b_calculate_round_trip() {
    let graph = chat_graph(MockLlm::with_tool_call_then_reply(
        "calculate",
        json!({"expression": "2+2"}),
        "2 + 2 = 4",
    ));
    let events: Vec<StreamEvent> = graph
        .stream(text_state("What is 2+2?"), [StreamMode::Updates, StreamMode::Values])
        .collect()
        .await;

    let updates: Vec<(String, StateUpdate)> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Updates { node_id, update } => Some((node_id.clone(), update.clone())),
            _ => None,
        })
        .collect();
    let order: Vec<&str> = updates.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(order, vec!["prompt", MODEL_NODE, TOOLS_NODE, MODEL_NODE]);

    match &updates[1].1.pending_tool_calls {
        PendingUpdate::Replace(calls) => {
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].tool_name, "calculate");
        }
        other => panic!("model should queue the call, got {:?}", other),
    }
    assert_eq!(updates[2].1.pending_tool_calls, PendingUpdate::Clear);

    let last = events
        .iter()
        .rev()
        .find_map(|e| match e {
            StreamEvent::Values(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap();
    let tail: Vec<(Role, &str)> = last.messages[2..]
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        tail,
        vec![
            (Role::Assistant, ""),
            (Role::Tool, "4"),
            (Role::Assistant, "2 + 2 = 4"),
        ]
    );
    assert_eq!(last.messages[3].tool_call_id.as_deref(), Some("call_1"));
    assert!(last.pending_tool_calls.is_empty());
    assert!(last.turn_complete);
}

/// **Scenario C**: a call to an unregistered tool becomes a tool message and
/// the turn still ends normally.
#[tokio::test]
async fn scenario_c_unknown_tool_is_conversational() {
    let graph = chat_graph(MockLlm::with_tool_call_then_reply(
        "does_not_exist",
        json!({}),
        "Sorry, I can't do that.",
    ));
    let out = graph.run(text_state("do the thing")).await.unwrap();

    let tool_msg = out
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .expect("tool message");
    assert!(tool_msg.content.contains("unknown tool: does_not_exist"), "{}", tool_msg.content);
    assert!(out.turn_complete);
    assert_eq!(out.last_assistant_reply(), Some("Sorry, I can't do that."));
    assert_eq!(
        out.metadata.get("tool_errors").and_then(|v| v.as_array()).map(Vec::len),
        Some(1)
    );
}

/// **Scenario**: identical input through identical stubs gives identical state.
#[tokio::test]
async fn same_input_same_output() {
    let run = || async {
        chat_graph(MockLlm::with_tool_call_then_reply(
            "calculate",
            json!({"expression": "6*7"}),
            "42",
        ))
        .run(text_state("6*7?"))
        .await
        .unwrap()
    };
    let a = run().await;
    let b = run().await;
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

/// **Scenario**: message history never shrinks between node executions.
#[tokio::test]
async fn message_count_is_monotonic() {
    let graph = chat_graph(MockLlm::with_tool_call_then_reply(
        "calculate",
        json!({"expression": "1+1"}),
        "2",
    ));
    let lens: Vec<usize> = graph
        .stream(text_state("1+1?"), [StreamMode::Values])
        .filter_map(|e| match e {
            StreamEvent::Values(s) => Some(s.messages.len()),
            _ => None,
        })
        .collect()
        .await;
    assert!(lens.len() >= 3);
    assert!(lens.windows(2).all(|w| w[0] <= w[1]), "{:?}", lens);
}

/// **Scenario**: a model that always asks for a tool hits the step limit
/// instead of looping forever.
#[tokio::test]
async fn endless_tool_loop_hits_step_limit() {
    let call = ToolCall::new("", "calculate", json!({"expression": "1"}));
    let llm = MockLlm::scripted(vec![Ok(chatgraph::LlmResponse::with_tool_calls("", vec![call]))]);
    let graph = build_chat_graph(
        Arc::new(llm),
        registry(),
        ChatGraphOptions {
            max_steps: 7,
            ..Default::default()
        },
    )
    .unwrap();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        graph.run(text_state("loop")),
    )
    .await
    .expect("run must not hang");
    assert!(matches!(result, Err(RunError::StepLimit { max_steps: 7 })));
}

/// **Scenario**: a failing LLM is encoded into state, not surfaced as a run error.
#[tokio::test]
async fn llm_failure_becomes_fallback_reply() {
    let graph = chat_graph(MockLlm::failing("connection reset"));
    let out = graph.run(text_state("hi")).await.unwrap();
    assert!(out.turn_complete);
    assert_eq!(out.last_assistant_reply(), Some(chatgraph::nodes::FALLBACK_REPLY));
    assert!(out.metadata.contains_key(chatgraph::nodes::ERROR_KEY));
}

#[test]
fn router_is_pure() {
    let mut state = text_state("x");
    assert_eq!(route_after_model(&state), END);
    assert_eq!(route_after_model(&state), END);
    state
        .pending_tool_calls
        .push(ToolCall::new("c", "calculate", json!({})));
    assert_eq!(route_after_model(&state), TOOLS_NODE);
}

/// **Scenario**: A provider that repeats one id for several calls still yields
/// one tool message per call with distinct `tool_call_id`s.
#[tokio::test]
async fn repeated_provider_ids_become_distinct_tool_messages() {
    let llm = MockLlm::scripted(vec![
        Ok(chatgraph::LlmResponse::with_tool_calls(
            "",
            vec![
                ToolCall::new("0", "calculate", json!({"expression": "1+1"})),
                ToolCall::new("0", "calculate", json!({"expression": "2+2"})),
            ],
        )),
        Ok(chatgraph::LlmResponse::text("2 and 4")),
    ]);

    let out = chat_graph(llm).run(text_state("1+1 and 2+2?")).await.unwrap();

    let tool_ids: Vec<&str> = out
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(tool_ids.len(), 2);
    assert_ne!(tool_ids[0], tool_ids[1]);
    let results: Vec<&str> = out
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(results, vec!["2", "4"]);
    assert_eq!(out.last_assistant_reply(), Some("2 and 4"));
}
