//! Node-level execution error.
//!
//! Returned by `Node::run` and `LlmClient::generate`. Recoverable failures (a
//! flaky model call, a failing tool) are encoded into the returned state update
//! instead; this error is reserved for failures that should abort the turn.

use thiserror::Error;

/// Node or LLM execution error.
///
/// The executor wraps it in `RunError::NodeFailed` together with the node id.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, malformed response).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display format of ExecutionFailed contains "execution failed" and the message.
    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("msg".to_string());
        let s = err.to_string();
        assert!(
            s.contains("execution failed"),
            "Display should contain 'execution failed': {}",
            s
        );
        assert!(s.contains("msg"), "Display should contain message: {}", s);
    }

    /// **Scenario**: Debug format includes variant name and message.
    #[test]
    fn agent_error_debug_format() {
        let err = AgentError::ExecutionFailed("test".to_string());
        let s = format!("{:?}", err);
        assert!(s.contains("ExecutionFailed"), "Debug should contain variant name: {}", s);
        assert!(s.contains("test"), "Debug should contain message: {}", s);
    }
}
