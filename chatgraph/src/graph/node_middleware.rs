//! Node middleware: wraps every node run of a compiled graph.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::state::{ConversationState, StateUpdate};

/// Boxed future returned by the wrapped node run.
pub type NodeFuture = Pin<Box<dyn Future<Output = Result<StateUpdate, AgentError>> + Send>>;

/// The wrapped node run; call it at most once.
pub type NodeRunFn = Box<dyn FnOnce(ConversationState) -> NodeFuture + Send>;

/// Around-hook for node execution (logging, timing, fault injection in tests).
///
/// Implementations call `inner(state)` to run the node and may inspect or
/// replace the result.
#[async_trait]
pub trait NodeMiddleware: Send + Sync {
    async fn around_run(
        &self,
        node_id: &str,
        state: ConversationState,
        inner: NodeRunFn,
    ) -> Result<StateUpdate, AgentError>;
}
