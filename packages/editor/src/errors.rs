//! Error types for the editor

use blockframe_model::{BlockId, InsertPosition, ModelError};
use thiserror::Error;

/// A structural edit the page's template constraints do not allow
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralViolation {
    #[error("Block {0} is locked by its template")]
    LockedBlock(BlockId),

    #[error("Cannot insert {position:?} block {reference}")]
    InsertionBlocked {
        reference: BlockId,
        position: InsertPosition,
    },

    #[error("Block not found: {0}")]
    UnknownBlock(BlockId),

    #[error("Cannot move block {0} relative to itself")]
    MoveIntoSelf(BlockId),

    #[error("Block {block_id} has no field {field}")]
    UnknownField { block_id: BlockId, field: String },

    #[error("Duplicate block id: {0}")]
    DuplicateId(BlockId),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    #[error("Mutation error: {0}")]
    Mutation(#[from] crate::mutations::MutationError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Field {field} of block {block_id} is not rich text")]
    NotRichText { block_id: BlockId, field: String },

    #[error("Selection does not belong to {block_id}.{field}")]
    SelectionMismatch { block_id: BlockId, field: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;
