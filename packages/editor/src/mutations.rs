//! # Page Mutations
//!
//! Primitive, invertible operations on a [`Page`]. The structural engine and
//! the template merge engine express every change as one or more of these so
//! the undo stack can record and reverse it.
//!
//! ## Mutation Semantics
//!
//! ### InsertBlock / RemoveBlock
//! - Operate on the top-level block list only
//! - Removing a block removes its nested children with it
//!
//! ### MoveBlocks
//! - Relocates a contiguous run, preserving relative order
//! - `to_index` is measured in the list with the run taken out
//!
//! ### SetField / RemoveField
//! - Atomic replacement of one field value, anywhere in the tree
//!
//! ### ReplaceBlocks
//! - Swaps the whole list; used for template insertion

use crate::page::Page;
use blockframe_model::{Block, BlockId, FieldValue, PlaceholderRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Insert a top-level block at index
    InsertBlock { index: usize, block: Block },

    /// Remove a top-level block and its children
    RemoveBlock { block_id: BlockId },

    /// Move a contiguous run of top-level blocks
    MoveBlocks { block_ids: Vec<BlockId>, to_index: usize },

    /// Set a field value
    SetField {
        block_id: BlockId,
        field: String,
        value: FieldValue,
    },

    /// Drop a field value
    RemoveField { block_id: BlockId, field: String },

    /// Change which placeholder region a block belongs to
    SetPlaceholder {
        block_id: BlockId,
        placeholder: Option<PlaceholderRef>,
    },

    /// Replace the entire top-level list
    ReplaceBlocks { blocks: Vec<Block> },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Index {index} out of bounds (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Duplicate block id: {0}")]
    DuplicateId(BlockId),

    #[error("Field not found: {block_id}.{field}")]
    FieldNotFound { block_id: BlockId, field: String },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

impl Mutation {
    /// Apply mutation to the page with validation
    pub fn apply(&self, page: &mut Page) -> Result<(), MutationError> {
        self.validate(page)?;

        match self {
            Mutation::InsertBlock { index, block } => Self::apply_insert(page, *index, block),
            Mutation::RemoveBlock { block_id } => Self::apply_remove(page, block_id),
            Mutation::MoveBlocks { block_ids, to_index } => Self::apply_move(page, block_ids, *to_index),
            Mutation::SetField { block_id, field, value } => {
                Self::apply_set_field(page, block_id, field, Some(value.clone()))
            }
            Mutation::RemoveField { block_id, field } => Self::apply_set_field(page, block_id, field, None),
            Mutation::SetPlaceholder { block_id, placeholder } => {
                Self::apply_set_placeholder(page, block_id, placeholder.clone())
            }
            Mutation::ReplaceBlocks { blocks } => {
                for block in blocks {
                    page.reserve_ids(block);
                }
                page.blocks = blocks.clone();
                Ok(())
            }
        }
    }

    /// Check the mutation can be applied without touching the page
    pub fn validate(&self, page: &Page) -> Result<(), MutationError> {
        match self {
            Mutation::InsertBlock { index, block } => {
                if *index > page.len() {
                    return Err(MutationError::IndexOutOfBounds {
                        index: *index,
                        len: page.len(),
                    });
                }
                for id in block.all_ids() {
                    if page.contains(id) {
                        return Err(MutationError::DuplicateId(id.clone()));
                    }
                }
                Ok(())
            }

            Mutation::RemoveBlock { block_id } => page
                .index_of(block_id)
                .map(|_| ())
                .ok_or_else(|| MutationError::BlockNotFound(block_id.clone())),

            Mutation::MoveBlocks { block_ids, to_index } => {
                Self::run_start(page, block_ids)?;
                let remaining = page.len() - block_ids.len();
                if *to_index > remaining {
                    return Err(MutationError::IndexOutOfBounds {
                        index: *to_index,
                        len: remaining,
                    });
                }
                Ok(())
            }

            Mutation::SetField { block_id, .. } | Mutation::SetPlaceholder { block_id, .. } => page
                .get(block_id)
                .map(|_| ())
                .ok_or_else(|| MutationError::BlockNotFound(block_id.clone())),

            Mutation::RemoveField { block_id, field } => {
                let block = page
                    .get(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                if block.field(field).is_none() {
                    return Err(MutationError::FieldNotFound {
                        block_id: block_id.clone(),
                        field: field.clone(),
                    });
                }
                Ok(())
            }

            Mutation::ReplaceBlocks { blocks } => {
                let mut seen = std::collections::HashSet::new();
                for id in blocks.iter().flat_map(|block| block.all_ids()) {
                    if !seen.insert(id) {
                        return Err(MutationError::DuplicateId(id.clone()));
                    }
                }
                Ok(())
            }
        }
    }

    /// Create the inverse mutation for undo, computed against the page
    /// before this mutation is applied
    pub fn to_inverse(&self, page: &Page) -> Result<Mutation, MutationError> {
        match self {
            Mutation::InsertBlock { block, .. } => Ok(Mutation::RemoveBlock {
                block_id: block.id.clone(),
            }),

            Mutation::RemoveBlock { block_id } => {
                let index = page
                    .index_of(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(Mutation::InsertBlock {
                    index,
                    block: page.blocks()[index].clone(),
                })
            }

            Mutation::MoveBlocks { block_ids, .. } => Ok(Mutation::MoveBlocks {
                block_ids: block_ids.clone(),
                to_index: Self::run_start(page, block_ids)?,
            }),

            Mutation::SetField { block_id, field, .. } | Mutation::RemoveField { block_id, field } => {
                let block = page
                    .get(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(match block.field(field) {
                    Some(previous) => Mutation::SetField {
                        block_id: block_id.clone(),
                        field: field.clone(),
                        value: previous.clone(),
                    },
                    None => Mutation::RemoveField {
                        block_id: block_id.clone(),
                        field: field.clone(),
                    },
                })
            }

            Mutation::SetPlaceholder { block_id, .. } => {
                let block = page
                    .get(block_id)
                    .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
                Ok(Mutation::SetPlaceholder {
                    block_id: block_id.clone(),
                    placeholder: block.placeholder.clone(),
                })
            }

            Mutation::ReplaceBlocks { .. } => Ok(Mutation::ReplaceBlocks {
                blocks: page.blocks().to_vec(),
            }),
        }
    }

    /// Debug name
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::InsertBlock { .. } => "insert_block",
            Mutation::RemoveBlock { .. } => "remove_block",
            Mutation::MoveBlocks { .. } => "move_blocks",
            Mutation::SetField { .. } => "set_field",
            Mutation::RemoveField { .. } => "remove_field",
            Mutation::SetPlaceholder { .. } => "set_placeholder",
            Mutation::ReplaceBlocks { .. } => "replace_blocks",
        }
    }

    /// Index of the first block of a contiguous, in-order run
    fn run_start(page: &Page, block_ids: &[BlockId]) -> Result<usize, MutationError> {
        let first = block_ids
            .first()
            .ok_or_else(|| MutationError::InvalidStructure("empty move".to_string()))?;
        let start = page
            .index_of(first)
            .ok_or_else(|| MutationError::BlockNotFound(first.clone()))?;

        for (offset, id) in block_ids.iter().enumerate() {
            match page.blocks().get(start + offset) {
                Some(block) if &block.id == id => {}
                _ if !page.contains(id) => return Err(MutationError::BlockNotFound(id.clone())),
                _ => {
                    return Err(MutationError::InvalidStructure(format!(
                        "blocks to move are not contiguous at {}",
                        id
                    )))
                }
            }
        }
        Ok(start)
    }

    fn apply_insert(page: &mut Page, index: usize, block: &Block) -> Result<(), MutationError> {
        page.reserve_ids(block);
        page.blocks.insert(index, block.clone());
        Ok(())
    }

    fn apply_remove(page: &mut Page, block_id: &BlockId) -> Result<(), MutationError> {
        let index = page
            .index_of(block_id)
            .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
        page.blocks.remove(index);
        Ok(())
    }

    fn apply_move(page: &mut Page, block_ids: &[BlockId], to_index: usize) -> Result<(), MutationError> {
        let start = Self::run_start(page, block_ids)?;
        let run: Vec<Block> = page.blocks.drain(start..start + block_ids.len()).collect();
        let at = to_index.min(page.blocks.len());
        page.blocks.splice(at..at, run);
        Ok(())
    }

    fn apply_set_field(
        page: &mut Page,
        block_id: &BlockId,
        field: &str,
        value: Option<FieldValue>,
    ) -> Result<(), MutationError> {
        let block = page
            .get_mut(block_id)
            .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
        match value {
            Some(value) => {
                block.fields.insert(field.to_string(), value);
            }
            None => {
                block.fields.remove(field);
            }
        }
        Ok(())
    }

    fn apply_set_placeholder(
        page: &mut Page,
        block_id: &BlockId,
        placeholder: Option<PlaceholderRef>,
    ) -> Result<(), MutationError> {
        let block = page
            .get_mut(block_id)
            .ok_or_else(|| MutationError::BlockNotFound(block_id.clone()))?;
        block.placeholder = placeholder;
        Ok(())
    }
}
