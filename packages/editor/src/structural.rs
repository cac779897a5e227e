//! Structural Edit Engine
//!
//! Add, remove and move on the page's block list, plus field updates. Every
//! change goes through the undo stack. Template constraints are checked up
//! front: a request the page does not allow is rejected before anything is
//! applied, and [`StructuralEngine::insertion_points`] lists the gaps a UI
//! may offer an add affordance for.

use crate::errors::{EditorResult, StructuralViolation};
use crate::instances::instance_of;
use crate::mutations::Mutation;
use crate::page::Page;
use crate::undo_stack::UndoStack;
use blockframe_model::{Block, BlockId, BlockType, FieldValue, IdGenerator, InsertPosition, PlaceholderRef, SchemaRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A gap in the block list where a new block may be added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertionPoint {
    pub reference: BlockId,
    pub position: InsertPosition,
}

#[derive(Debug)]
pub struct StructuralEngine {
    schema: SchemaRegistry,
    history: UndoStack,
}

impl StructuralEngine {
    pub fn new(schema: SchemaRegistry) -> Self {
        Self::with_undo_levels(schema, 100)
    }

    pub fn with_undo_levels(schema: SchemaRegistry, undo_levels: usize) -> Self {
        Self {
            schema,
            history: UndoStack::with_max_levels(undo_levels),
        }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Every gap an add affordance may be rendered for.
    ///
    /// Each gap is named once: by the block after it, or for the last gap by
    /// the block before it. An empty page has no reference block and so no
    /// points.
    pub fn insertion_points(&self, page: &Page) -> Vec<InsertionPoint> {
        let blocks = page.blocks();
        (0..=blocks.len())
            .filter(|&gap| gap_allowed(blocks, gap))
            .filter_map(|gap| match blocks.get(gap) {
                Some(next) => Some(InsertionPoint {
                    reference: next.id.clone(),
                    position: InsertPosition::Before,
                }),
                None => blocks.last().map(|last| InsertionPoint {
                    reference: last.id.clone(),
                    position: InsertPosition::After,
                }),
            })
            .collect()
    }

    /// Gap index for an insertion relative to a top-level block
    pub fn insertion_gap(
        &self,
        page: &Page,
        reference_id: &BlockId,
        position: InsertPosition,
    ) -> Result<usize, StructuralViolation> {
        let index = page
            .index_of(reference_id)
            .ok_or_else(|| StructuralViolation::UnknownBlock(reference_id.clone()))?;
        let gap = match position {
            InsertPosition::Before => index,
            InsertPosition::After => index + 1,
        };

        if gap_allowed(page.blocks(), gap) {
            Ok(gap)
        } else {
            Err(StructuralViolation::InsertionBlocked {
                reference: reference_id.clone(),
                position,
            })
        }
    }

    /// Insert a new block with default field values and select it
    pub fn add_block(
        &mut self,
        page: &mut Page,
        reference_id: &BlockId,
        position: InsertPosition,
        block_type: BlockType,
    ) -> EditorResult<BlockId> {
        let gap = self.insertion_gap(page, reference_id, position)?;

        let id = page.new_block_id();
        let mut node_ids = IdGenerator::from_seed(id.as_str());
        let mut block = Block::new(id.clone(), block_type.clone());
        block.fields = self.schema.defaults_for(&block_type, &mut node_ids)?;
        block.placeholder = joined_placeholder(page.blocks(), gap);

        debug!(block_id = %id, block_type = %block_type, index = gap, "Adding block");
        self.history.apply(Mutation::InsertBlock { index: gap, block }, page)?;
        page.set_selection(Some(id.clone()));
        Ok(id)
    }

    /// Remove an unlocked top-level block.
    ///
    /// A selected block hands the selection to the previous block, or to the
    /// new first block when it was first.
    pub fn remove_block(&mut self, page: &mut Page, block_id: &BlockId) -> EditorResult<()> {
        let index = page
            .index_of(block_id)
            .ok_or_else(|| StructuralViolation::UnknownBlock(block_id.clone()))?;
        let block = &page.blocks()[index];
        if block.locked {
            return Err(StructuralViolation::LockedBlock(block_id.clone()).into());
        }

        let was_selected = page
            .selection()
            .is_some_and(|selected| block.find(selected).is_some());

        debug!(block_id = %block_id, index, "Removing block");
        self.history.apply(
            Mutation::RemoveBlock {
                block_id: block_id.clone(),
            },
            page,
        )?;

        if was_selected {
            let next = match index {
                0 => page.blocks().first(),
                i => page.blocks().get(i - 1),
            };
            page.set_selection(next.map(|block| block.id.clone()));
        }
        Ok(())
    }

    /// Move a block, or with `whole_instance` its whole template instance,
    /// before or after a target block
    pub fn move_block(
        &mut self,
        page: &mut Page,
        block_id: &BlockId,
        target_id: &BlockId,
        position: InsertPosition,
        whole_instance: bool,
    ) -> EditorResult<()> {
        let start = page
            .index_of(block_id)
            .ok_or_else(|| StructuralViolation::UnknownBlock(block_id.clone()))?;
        if page.index_of(target_id).is_none() {
            return Err(StructuralViolation::UnknownBlock(target_id.clone()).into());
        }

        let run: Vec<BlockId> = match instance_of(page.blocks(), block_id) {
            Some(instance) if whole_instance => instance.block_ids,
            _ if page.blocks()[start].locked => {
                return Err(StructuralViolation::LockedBlock(block_id.clone()).into())
            }
            _ => vec![block_id.clone()],
        };
        if run.contains(target_id) {
            return Err(StructuralViolation::MoveIntoSelf(block_id.clone()).into());
        }

        let run_start = page.index_of(&run[0]).unwrap_or(start);
        let remaining: Vec<&Block> = page
            .blocks()
            .iter()
            .filter(|block| !run.contains(&block.id))
            .collect();
        let target = remaining
            .iter()
            .position(|block| &block.id == target_id)
            .ok_or_else(|| StructuralViolation::UnknownBlock(target_id.clone()))?;
        let gap = match position {
            InsertPosition::Before => target,
            InsertPosition::After => target + 1,
        };

        let before = gap.checked_sub(1).and_then(|i| remaining.get(i)).copied();
        let after = remaining.get(gap).copied();
        let splits_instance = run.len() > 1
            && before
                .and_then(Block::template_name)
                .is_some_and(|name| Some(name) == after.and_then(Block::template_name));
        if (before.is_some_and(|b| b.locked) && after.is_some_and(|a| a.locked)) || splits_instance {
            return Err(StructuralViolation::InsertionBlocked {
                reference: target_id.clone(),
                position,
            }
            .into());
        }

        if gap == run_start {
            return Ok(());
        }

        let placeholder = if run.len() == 1 {
            Some(neighbour_placeholder(before, after))
        } else {
            None
        };

        debug!(block_id = %block_id, blocks = run.len(), to_index = gap, "Moving blocks");
        self.history.begin_batch("Move block", page);
        let result = self.apply_move(page, run, gap, placeholder);
        match result {
            Ok(()) => {
                self.history.end_batch();
                Ok(())
            }
            Err(error) => {
                self.history.abort_batch(page)?;
                Err(error)
            }
        }
    }

    fn apply_move(
        &mut self,
        page: &mut Page,
        run: Vec<BlockId>,
        to_index: usize,
        placeholder: Option<Option<PlaceholderRef>>,
    ) -> EditorResult<()> {
        let moved = run[0].clone();
        self.history.apply(
            Mutation::MoveBlocks {
                block_ids: run,
                to_index,
            },
            page,
        )?;

        if let Some(placeholder) = placeholder {
            let current = page.get(&moved).and_then(|block| block.placeholder.clone());
            if current != placeholder {
                self.history.apply(
                    Mutation::SetPlaceholder {
                        block_id: moved,
                        placeholder,
                    },
                    page,
                )?;
            }
        }
        Ok(())
    }

    /// Set a field value. Returns false when the value was already current.
    pub fn update_field(
        &mut self,
        page: &mut Page,
        block_id: &BlockId,
        field: &str,
        value: FieldValue,
    ) -> EditorResult<bool> {
        let block = page
            .get(block_id)
            .ok_or_else(|| StructuralViolation::UnknownBlock(block_id.clone()))?;
        if block.locked {
            return Err(StructuralViolation::LockedBlock(block_id.clone()).into());
        }
        if let Some(schema) = self.schema.get(&block.block_type) {
            if schema.field(field).is_none() {
                return Err(StructuralViolation::UnknownField {
                    block_id: block_id.clone(),
                    field: field.to_string(),
                }
                .into());
            }
        }
        if block.field(field) == Some(&value) {
            return Ok(false);
        }

        self.history.apply(
            Mutation::SetField {
                block_id: block_id.clone(),
                field: field.to_string(),
                value,
            },
            page,
        )?;
        Ok(true)
    }

    /// Swap in a new block list as one undo step
    pub fn replace_blocks(&mut self, page: &mut Page, blocks: Vec<Block>, description: &str) -> EditorResult<()> {
        self.history.begin_batch(description, page);
        if let Err(error) = self.history.apply(Mutation::ReplaceBlocks { blocks }, page) {
            self.history.abort_batch(page)?;
            return Err(error.into());
        }
        self.history.end_batch();
        page.repair_selection();
        Ok(())
    }

    pub fn undo(&mut self, page: &mut Page) -> EditorResult<bool> {
        let undone = self.history.undo(page)?;
        page.repair_selection();
        Ok(undone)
    }

    pub fn redo(&mut self, page: &mut Page) -> EditorResult<bool> {
        let redone = self.history.redo(page)?;
        page.repair_selection();
        Ok(redone)
    }

    /// Forget history, e.g. after the page was reloaded and merged
    pub fn reset_history(&mut self) {
        self.history.clear();
    }
}

fn is_placeholder_member(block: &Block) -> bool {
    block.template_source.is_none() && block.placeholder.is_some()
}

/// Whether a block may be inserted at `gap` (between `blocks[gap - 1]` and `blocks[gap]`)
fn gap_allowed(blocks: &[Block], gap: usize) -> bool {
    let before = gap.checked_sub(1).and_then(|i| blocks.get(i));
    let after = blocks.get(gap);
    let locked = |block: Option<&Block>| block.is_some_and(|b| b.locked);
    let member = |block: Option<&Block>| block.is_some_and(is_placeholder_member);

    match (locked(before), locked(after)) {
        (true, true) => false,
        (true, false) => member(after),
        (false, true) => member(before),
        (false, false) => true,
    }
}

/// Placeholder a block inserted at `gap` joins
fn joined_placeholder(blocks: &[Block], gap: usize) -> Option<PlaceholderRef> {
    let before = gap.checked_sub(1).and_then(|i| blocks.get(i));
    neighbour_placeholder(before, blocks.get(gap))
}

fn neighbour_placeholder(before: Option<&Block>, after: Option<&Block>) -> Option<PlaceholderRef> {
    match (before, after) {
        (Some(b), _) if is_placeholder_member(b) => b.placeholder.clone(),
        (Some(b), Some(a)) if b.locked && is_placeholder_member(a) => a.placeholder.clone(),
        (None, Some(a)) if is_placeholder_member(a) => a.placeholder.clone(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EditorError;
    use blockframe_model::TemplateSource;

    fn fixed(id: &str, index: usize) -> Block {
        let mut block = Block::new(id, BlockType::Title);
        block.locked = true;
        block.template_source = Some(TemplateSource::new("T", vec![index]));
        block
    }

    fn member(id: &str) -> Block {
        Block::new(id, BlockType::Text).in_placeholder(PlaceholderRef::new("T", "main"))
    }

    fn text(id: &str) -> Block {
        Block::new(id, BlockType::Text)
    }

    fn order(page: &Page) -> Vec<&str> {
        page.blocks().iter().map(|block| block.id.as_str()).collect()
    }

    fn engine() -> StructuralEngine {
        StructuralEngine::new(SchemaRegistry::with_builtins())
    }

    #[test]
    fn test_no_insertion_between_locked_blocks() {
        let page = Page::new("/p", vec![fixed("h", 0), fixed("f", 2)]).unwrap();
        let engine = engine();

        assert!(engine.insertion_points(&page).is_empty());
        assert!(matches!(
            engine.insertion_gap(&page, &BlockId::from("h"), InsertPosition::After),
            Err(StructuralViolation::InsertionBlocked { .. })
        ));
    }

    #[test]
    fn test_insertion_points_inside_placeholder() {
        let page = Page::new("/p", vec![text("a"), fixed("h", 0), member("x"), fixed("f", 2)]).unwrap();
        let points = engine().insertion_points(&page);

        let references: Vec<(&str, InsertPosition)> = points
            .iter()
            .map(|point| (point.reference.as_str(), point.position))
            .collect();
        assert_eq!(
            references,
            vec![("a", InsertPosition::Before), ("x", InsertPosition::Before), ("f", InsertPosition::Before)]
        );
    }

    #[test]
    fn test_added_block_joins_placeholder() {
        let mut page = Page::new("/p", vec![fixed("h", 0), member("x"), fixed("f", 2)]).unwrap();
        let mut engine = engine();

        let id = engine
            .add_block(&mut page, &BlockId::from("x"), InsertPosition::After, BlockType::Slate)
            .unwrap();
        let added = page.get(&id).unwrap();
        assert_eq!(added.placeholder, Some(PlaceholderRef::new("T", "main")));
        assert!(added.field("value").is_some());
        assert_eq!(page.selection(), Some(&id));
    }

    #[test]
    fn test_locked_block_cannot_be_removed_or_edited() {
        let mut page = Page::new("/p", vec![fixed("h", 0), text("a")]).unwrap();
        let mut engine = engine();

        let removed = engine.remove_block(&mut page, &BlockId::from("h"));
        assert!(matches!(removed, Err(EditorError::Structural(StructuralViolation::LockedBlock(_)))));

        let edited = engine.update_field(&mut page, &BlockId::from("h"), "title", FieldValue::text("x"));
        assert!(matches!(edited, Err(EditorError::Structural(StructuralViolation::LockedBlock(_)))));
        assert_eq!(order(&page), vec!["h", "a"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut page = Page::new("/p", vec![text("a")]).unwrap();
        let result = engine().update_field(&mut page, &BlockId::from("a"), "nope", FieldValue::text("x"));
        assert!(matches!(result, Err(EditorError::Structural(StructuralViolation::UnknownField { .. }))));
    }

    #[test]
    fn test_unchanged_value_records_nothing() {
        let mut page = Page::new("/p", vec![text("a").with_field("text", FieldValue::text("x"))]).unwrap();
        let mut engine = engine();

        let changed = engine
            .update_field(&mut page, &BlockId::from("a"), "text", FieldValue::text("x"))
            .unwrap();
        assert!(!changed);
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn test_move_whole_instance() {
        let mut page = Page::new(
            "/p",
            vec![text("a"), fixed("h", 0), member("x"), fixed("f", 2), text("b")],
        )
        .unwrap();
        let mut engine = engine();

        engine
            .move_block(&mut page, &BlockId::from("x"), &BlockId::from("b"), InsertPosition::After, true)
            .unwrap();
        assert_eq!(order(&page), vec!["a", "b", "h", "x", "f"]);

        engine.undo(&mut page).unwrap();
        assert_eq!(order(&page), vec!["a", "h", "x", "f", "b"]);
    }

    #[test]
    fn test_move_locked_block_alone_refused() {
        let mut page = Page::new("/p", vec![fixed("h", 0), text("a")]).unwrap();
        let result = engine().move_block(&mut page, &BlockId::from("h"), &BlockId::from("a"), InsertPosition::After, false);
        assert!(matches!(result, Err(EditorError::Structural(StructuralViolation::LockedBlock(_)))));
    }

    #[test]
    fn test_move_into_self_refused() {
        let mut page = Page::new("/p", vec![fixed("h", 0), member("x"), fixed("f", 2)]).unwrap();
        let result = engine().move_block(&mut page, &BlockId::from("x"), &BlockId::from("f"), InsertPosition::After, true);
        assert!(matches!(result, Err(EditorError::Structural(StructuralViolation::MoveIntoSelf(_)))));
    }

    #[test]
    fn test_moved_member_leaves_placeholder() {
        let mut page = Page::new("/p", vec![fixed("h", 0), member("x"), member("y"), fixed("f", 2), text("a")]).unwrap();
        let mut engine = engine();

        engine
            .move_block(&mut page, &BlockId::from("y"), &BlockId::from("a"), InsertPosition::After, false)
            .unwrap();
        assert_eq!(order(&page), vec!["h", "x", "f", "a", "y"]);
        assert!(page.get(&BlockId::from("y")).unwrap().placeholder.is_none());

        engine.undo(&mut page).unwrap();
        assert_eq!(order(&page), vec!["h", "x", "y", "f", "a"]);
        assert!(page.get(&BlockId::from("y")).unwrap().placeholder.is_some());
    }
}
