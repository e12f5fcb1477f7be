//! ToolRegistry properties: lookup identity, duplicate rejection, schema
//! validation before execution, freeze lifecycle and failure reporting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chatgraph::tools::{handler_fn, ToolCallContent, ToolHandler};
use chatgraph::{RegistryError, Role, ToolCall, ToolDefinition, ToolError, ToolRegistry};
use serde_json::{json, Value};

fn schema() -> Value {
    json!({
        "type": "object",
        "properties": { "city": { "type": "string" } },
        "required": ["city"]
    })
}

fn counting_tool(name: &str, calls: Arc<AtomicUsize>) -> ToolDefinition {
    ToolDefinition::new(
        name,
        "Weather lookup",
        schema(),
        handler_fn(move |args, _ctx| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let city = args.get("city").and_then(Value::as_str).unwrap_or_default();
                Ok::<_, ToolError>(ToolCallContent::from(format!("sunny in {}", city)))
            }
        }),
    )
}

#[test]
fn get_returns_the_registered_definition() {
    let handler: Arc<dyn ToolHandler> = handler_fn(|_args, _ctx| async {
        Ok::<_, ToolError>(ToolCallContent::from("ok"))
    });
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDefinition::new("echo", "Echo", schema(), handler.clone()))
        .unwrap();

    let found = registry.get("echo").unwrap();
    assert_eq!(found.name(), "echo");
    assert_eq!(found.parameter_schema(), &schema());
    assert!(Arc::ptr_eq(found.handler(), &handler));
}

/// **Scenario**: a duplicate registration fails and leaves the registry unchanged.
#[test]
fn duplicate_registration_is_rejected_without_side_effects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(counting_tool("weather", calls.clone())).unwrap();
    let before: Vec<String> = registry.names().iter().map(|s| s.to_string()).collect();

    let err = registry
        .register(counting_tool("weather", calls))
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateTool("weather".into()));
    assert_eq!(registry.names(), before);
    assert_eq!(registry.len(), 1);
}

#[test]
fn listing_preserves_registration_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    for name in ["zeta", "alpha", "mid"] {
        registry.register(counting_tool(name, calls.clone())).unwrap();
    }
    let listed: Vec<&str> = registry.list().map(|d| d.name()).collect();
    assert_eq!(listed, vec!["zeta", "alpha", "mid"]);
    let specs: Vec<String> = registry.specs().into_iter().map(|s| s.name).collect();
    assert_eq!(specs, vec!["zeta", "alpha", "mid"]);
}

/// **Scenario**: a valid call yields a tool message answering the call id.
#[tokio::test]
async fn valid_call_produces_tool_message_for_call_id() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(counting_tool("weather", calls.clone())).unwrap();

    let call = ToolCall::new("call_42", "weather", json!({"city": "Oslo"}));
    let outcome = registry.invoke(&call).await.unwrap();
    assert!(!outcome.is_error());
    assert_eq!(outcome.message.role, Role::Tool);
    assert_eq!(outcome.message.tool_call_id.as_deref(), Some("call_42"));
    assert_eq!(outcome.message.content, "sunny in Oslo");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// **Scenario**: arguments violating the schema are rejected and the handler never runs.
#[tokio::test]
async fn invalid_arguments_never_reach_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(counting_tool("weather", calls.clone())).unwrap();

    for args in [json!({}), json!({"city": 7})] {
        let call = ToolCall::new("c", "weather", args);
        match registry.invoke(&call).await {
            Err(RegistryError::InvalidArguments { tool, violations }) => {
                assert_eq!(tool, "weather");
                assert!(!violations.is_empty());
            }
            other => panic!("expected InvalidArguments, got {:?}", other),
        }
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_tool_is_an_error() {
    let registry = ToolRegistry::new();
    let call = ToolCall::new("c", "ghost", json!({}));
    assert_eq!(
        registry.invoke(&call).await.err(),
        Some(RegistryError::UnknownTool("ghost".into()))
    );
}

#[test]
fn invalid_schema_is_rejected_at_registration() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    let bad = ToolDefinition::new(
        "bad",
        "Broken schema",
        json!({"type": "not-a-type"}),
        counting_tool("x", calls).handler().clone(),
    );
    assert!(matches!(
        registry.register(bad),
        Err(RegistryError::InvalidSchema { .. })
    ));
    assert!(registry.is_empty());
}

/// **Scenario**: the first invoke freezes the registry.
#[tokio::test]
async fn registration_after_first_invoke_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(counting_tool("weather", calls.clone())).unwrap();
    registry
        .invoke(&ToolCall::new("c", "weather", json!({"city": "Rome"})))
        .await
        .unwrap();

    assert!(registry.is_frozen());
    assert_eq!(
        registry.register(counting_tool("late", calls)),
        Err(RegistryError::Frozen("late".into()))
    );
}

/// **Scenario**: a panicking handler is reported, not propagated.
#[tokio::test]
async fn panicking_handler_becomes_execution_error() {
    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDefinition::new(
            "boom",
            "Always panics",
            json!({"type": "object"}),
            handler_fn(|_args, _ctx| async {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, ToolError>(ToolCallContent::from(""))
            }),
        ))
        .unwrap();

    let outcome = registry
        .invoke(&ToolCall::new("c9", "boom", json!({})))
        .await
        .unwrap();
    let error = outcome.error.expect("execution error");
    assert_eq!(error.tool, "boom");
    assert_eq!(error.call_id, "c9");
    assert!(error.cause.contains("kaboom"), "{}", error.cause);
    assert_eq!(outcome.message.tool_call_id.as_deref(), Some("c9"));
}
