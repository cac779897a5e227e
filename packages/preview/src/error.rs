use blockframe_model::{BlockId, ModelError};
use thiserror::Error;

/// A DOM marker the synchronizer needs is missing or points nowhere.
///
/// Surfaced as a developer-visible warning; editing continues with
/// approximate caret placement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("Block {0} is not rendered")]
    BlockNotRendered(BlockId),

    #[error("Field {field} of block {block_id} is not rendered")]
    FieldNotRendered { block_id: BlockId, field: String },

    #[error("Rich-text content in field {field} of block {block_id} has no node-id marker")]
    MissingNodeId { block_id: BlockId, field: String },

    #[error("Selection path in field {field} of block {block_id} does not resolve in the rendered markup")]
    UnresolvedPath { block_id: BlockId, field: String },

    #[error("Element is not inside an editable field")]
    NotEditable,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreviewError {
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("No field is focused")]
    NotFocused,

    #[error("Field {0} is not a rich-text field")]
    NotRichText(String),

    #[error("Field {0} has no inline text value")]
    NotTextual(String),
}
