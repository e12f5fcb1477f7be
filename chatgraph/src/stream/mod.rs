//! Streaming types for graph runs.
//!
//! Defines stream modes and the events emitted by `CompiledGraph::stream` and
//! by nodes that publish incremental results through `RunContext`.

use serde_json::Value;

use crate::state::{ConversationState, StateUpdate};

/// Stream mode selector: which kinds of events to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// Emit full state after each node completes.
    Values,
    /// Emit the node id and the partial update it returned.
    Updates,
    /// Emit assistant text chunks.
    Messages,
    /// Emit custom JSON payloads from nodes or tools.
    Custom,
}

/// Metadata attached to streamed messages.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamMetadata {
    /// Node that produced the message.
    pub node_id: String,
}

/// One chunk of streamed message content.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageChunk {
    pub content: String,
}

/// Event emitted while running a graph.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// Full state snapshot after a node finishes.
    Values(ConversationState),
    /// Partial update returned by `node_id`, as applied.
    Updates { node_id: String, update: StateUpdate },
    /// Message chunk emitted by a node (e.g. the model node's reply).
    Messages {
        chunk: MessageChunk,
        metadata: StreamMetadata,
    },
    /// Custom JSON payload (tool progress and similar).
    Custom(Value),
    /// The run failed; last event of the stream.
    Failed { error: String },
}
