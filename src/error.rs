//! Error types for chart editing and document persistence.
//!
//! Only user-visible failures are errors. Dangling parents, unresolvable
//! collisions and empty layouts are handled silently by the engine.

use crate::types::{GroupId, NodeId};
use thiserror::Error;

/// Errors raised by structural chart operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("Cyclic parent chain detected at node {0}")]
    CycleDetected(NodeId),

    #[error("Cannot make {parent} the parent of {child}: it would create a cycle")]
    InvalidParent { child: NodeId, parent: NodeId },

    #[error("A group needs at least two existing nodes")]
    GroupTooSmall,
}

/// Errors raised while reading or writing chart documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Invalid chart document: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Chart document has no nodes array")]
    MissingNodes,

    #[error("Duplicate node id in document: {0}")]
    DuplicateNodeId(NodeId),

    #[error("No stored chart found")]
    NotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_node() {
        let err = ChartError::InvalidParent {
            child: "node-1".into(),
            parent: "node-3".into(),
        };
        let text = err.to_string();
        assert!(text.contains("node-1"));
        assert!(text.contains("node-3"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: DocumentError = parse.unwrap_err().into();
        assert!(matches!(err, DocumentError::InvalidJson(_)));
    }
}
