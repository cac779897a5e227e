//! Page block registry
//!
//! The ordered top-level block list is the single source of truth for page
//! structure. Nested blocks live in their container's `children`.

use crate::errors::{EditorResult, StructuralViolation};
use blockframe_model::{Block, BlockId, IdGenerator, SchemaRegistry};
use blockframe_protocol::StatePayload;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stored form of a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    pub path: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Id counter high-water mark; minted ids stay above it after a reload
    #[serde(default, skip_serializing_if = "is_zero")]
    pub last_id: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

#[derive(Debug, Clone)]
pub struct Page {
    path: String,
    pub(crate) blocks: Vec<Block>,
    selection: Option<BlockId>,
    ids: IdGenerator,
}

impl Page {
    /// Build a page, reserving every id already present so fresh ids never collide
    pub fn new(path: impl Into<String>, blocks: Vec<Block>) -> Result<Self, StructuralViolation> {
        let path = path.into();
        let mut seen = HashSet::new();
        for block in &blocks {
            for id in block.all_ids() {
                if !seen.insert(id.clone()) {
                    return Err(StructuralViolation::DuplicateId(id.clone()));
                }
            }
        }

        let mut ids = IdGenerator::new(&path);
        ids.reserve_all(seen.iter().map(|id| id.as_str().to_string()));

        Ok(Self {
            path,
            blocks,
            selection: None,
            ids,
        })
    }

    pub fn from_document(document: PageDocument) -> Result<Self, StructuralViolation> {
        let mut page = Self::new(document.path, document.blocks)?;
        page.ids.advance_to(document.last_id);
        Ok(page)
    }

    pub fn from_json(raw: &str) -> EditorResult<Self> {
        let document: PageDocument = serde_json::from_str(raw)?;
        Ok(Self::from_document(document)?)
    }

    pub fn to_document(&self) -> PageDocument {
        PageDocument {
            path: self.path.clone(),
            blocks: self.blocks.clone(),
            last_id: self.ids.count(),
        }
    }

    pub fn to_json(&self) -> EditorResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Top-level block ids in layout order
    pub fn order(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|block| block.id.clone()).collect()
    }

    /// Position of a top-level block
    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| &block.id == id)
    }

    /// Find a block anywhere in the tree
    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find_map(|block| block.find(id))
    }

    pub(crate) fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find_map(|block| block.find_mut(id))
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.get(id).is_some()
    }

    /// Every block id on the page, depth first
    pub fn all_ids(&self) -> Vec<&BlockId> {
        self.blocks.iter().flat_map(|block| block.all_ids()).collect()
    }

    pub fn selection(&self) -> Option<&BlockId> {
        self.selection.as_ref()
    }

    pub fn select(&mut self, id: Option<BlockId>) -> Result<(), StructuralViolation> {
        if let Some(id) = &id {
            if !self.contains(id) {
                return Err(StructuralViolation::UnknownBlock(id.clone()));
            }
        }
        self.selection = id;
        Ok(())
    }

    pub(crate) fn set_selection(&mut self, id: Option<BlockId>) {
        self.selection = id;
    }

    /// Clear the selection if its block no longer exists
    pub(crate) fn repair_selection(&mut self) {
        if let Some(id) = &self.selection {
            if !self.contains(id) {
                self.selection = None;
            }
        }
    }

    pub fn new_block_id(&mut self) -> BlockId {
        self.ids.new_block_id()
    }

    pub(crate) fn ids_mut(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Keep ids of blocks coming back through undo from being minted again
    pub(crate) fn reserve_ids(&mut self, block: &Block) {
        self.ids
            .reserve_all(block.all_ids().into_iter().map(|id| id.as_str().to_string()));
    }

    /// Full snapshot sent to the preview
    pub fn state_payload(&self, schema: &SchemaRegistry) -> StatePayload {
        StatePayload {
            blocks: self
                .blocks
                .iter()
                .map(|block| (block.id.clone(), block.clone()))
                .collect(),
            block_order: self.order(),
            schema: {
                let mut schemas: Vec<_> = schema
                    .block_types()
                    .filter_map(|block_type| schema.get(block_type))
                    .cloned()
                    .collect();
                schemas.sort_by(|a, b| a.block_type.as_str().cmp(b.block_type.as_str()));
                schemas
            },
            selected_block: self.selection.clone(),
        }
    }
}
