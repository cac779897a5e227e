use thiserror::Error;

/// Errors raised by model-level operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Rich-text node not found: {0}")]
    NodeNotFound(String),

    #[error("Rich-text node is not a leaf: {0}")]
    NotALeaf(String),

    #[error("Offset {offset} out of range for node {node} (length {len})")]
    OffsetOutOfRange {
        node: String,
        offset: usize,
        len: usize,
    },

    #[error("Duplicate rich-text node id: {0}")]
    DuplicateNodeId(String),

    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("Block type {block_type} has no field {field}")]
    UnknownField { block_type: String, field: String },
}

/// Model Result type alias
pub type ModelResult<T> = Result<T, ModelError>;
