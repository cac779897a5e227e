//! # Undo history
//!
//! Each step holds the mutations as applied, their inverses in undo order,
//! and the block that was selected when the step began. Recording a new step
//! drops the redo branch; once `max_levels` steps exist the oldest is
//! forgotten.
//!
//! Multi-mutation edits (whole-instance moves, template insertion) are
//! grouped with [`UndoStack::begin_batch`] / [`UndoStack::end_batch`] so one
//! undo reverts all of them.

use crate::mutations::{Mutation, MutationError};
use crate::page::Page;
use blockframe_model::BlockId;
use std::collections::VecDeque;

/// One undoable step
#[derive(Debug, Clone)]
pub struct MutationBatch {
    /// Application order
    pub mutations: Vec<Mutation>,

    /// Undo order (last applied first)
    pub inverses: Vec<Mutation>,

    pub description: String,

    /// Restored on undo when the block still exists
    pub selection_before: Option<BlockId>,
}

impl MutationBatch {
    fn open(description: impl Into<String>, selection_before: Option<BlockId>) -> Self {
        Self {
            mutations: Vec::new(),
            inverses: Vec::new(),
            description: description.into(),
            selection_before,
        }
    }

    fn record(&mut self, mutation: Mutation, inverse: Mutation) {
        self.mutations.push(mutation);
        self.inverses.insert(0, inverse);
    }

    fn revert(&self, page: &mut Page) -> Result<(), MutationError> {
        self.inverses.iter().try_for_each(|inverse| inverse.apply(page))
    }

    fn replay(&self, page: &mut Page) -> Result<(), MutationError> {
        self.mutations.iter().try_for_each(|mutation| mutation.apply(page))
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

#[derive(Debug)]
pub struct UndoStack {
    done: VecDeque<MutationBatch>,
    undone: Vec<MutationBatch>,
    /// 0 = unlimited
    max_levels: usize,
    pending: Option<MutationBatch>,
}

impl UndoStack {
    /// History keeping the last 100 steps
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            done: VecDeque::new(),
            undone: Vec::new(),
            max_levels,
            pending: None,
        }
    }

    /// Apply a mutation and record it, as its own step or inside the open batch.
    ///
    /// A mutation that fails validation leaves both the page and the history
    /// untouched.
    pub fn apply(&mut self, mutation: Mutation, page: &mut Page) -> Result<(), MutationError> {
        let selection = page.selection().cloned();
        let inverse = mutation.to_inverse(page)?;
        mutation.apply(page)?;

        match &mut self.pending {
            Some(batch) => batch.record(mutation, inverse),
            None => {
                let mut step = MutationBatch::open(mutation.name(), selection);
                step.record(mutation, inverse);
                self.push(step);
            }
        }
        Ok(())
    }

    pub fn begin_batch(&mut self, description: impl Into<String>, page: &Page) {
        self.pending = Some(MutationBatch::open(description, page.selection().cloned()));
    }

    /// Close the open batch; an empty batch records nothing
    pub fn end_batch(&mut self) {
        if let Some(batch) = self.pending.take().filter(|batch| !batch.is_empty()) {
            self.push(batch);
        }
    }

    /// Revert whatever the open batch applied and discard it
    pub fn abort_batch(&mut self, page: &mut Page) -> Result<(), MutationError> {
        match self.pending.take() {
            Some(batch) => batch.revert(page),
            None => Ok(()),
        }
    }

    fn push(&mut self, step: MutationBatch) {
        self.done.push_back(step);
        if self.max_levels > 0 {
            while self.done.len() > self.max_levels {
                self.done.pop_front();
            }
        }
        self.undone.clear();
    }

    /// Revert the latest step. Returns false when there is nothing to undo.
    pub fn undo(&mut self, page: &mut Page) -> Result<bool, MutationError> {
        let Some(step) = self.done.pop_back() else {
            return Ok(false);
        };
        step.revert(page)?;
        if let Some(id) = step.selection_before.as_ref().filter(|id| page.contains(id)) {
            page.set_selection(Some(id.clone()));
        }
        self.undone.push(step);
        Ok(true)
    }

    /// Re-apply the latest undone step. Returns false when there is nothing to redo.
    pub fn redo(&mut self, page: &mut Page) -> Result<bool, MutationError> {
        let Some(step) = self.undone.pop() else {
            return Ok(false);
        };
        step.replay(page)?;
        self.done.push_back(step);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.done.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.undone.len()
    }

    /// Forget all history, including an open batch
    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
        self.pending = None;
    }

    /// Label for an "Undo ..." menu entry
    pub fn undo_description(&self) -> Option<&str> {
        self.done.back().map(|step| step.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.undone.last().map(|step| step.description.as_str())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockframe_model::{Block, BlockType, FieldValue};

    fn page() -> Page {
        Page::new(
            "/test",
            vec![Block::new("a", BlockType::Text), Block::new("b", BlockType::Text)],
        )
        .unwrap()
    }

    fn set_text(id: &str, text: &str) -> Mutation {
        Mutation::SetField {
            block_id: BlockId::from(id),
            field: "text".to_string(),
            value: FieldValue::text(text),
        }
    }

    #[test]
    fn test_empty_history() {
        let mut page = page();
        let mut stack = UndoStack::new();
        assert!(!stack.can_undo());
        assert!(!stack.undo(&mut page).unwrap());
        assert!(!stack.redo(&mut page).unwrap());
    }

    #[test]
    fn test_apply_undo_redo() {
        let mut page = page();
        let mut stack = UndoStack::new();

        stack.apply(set_text("a", "World"), &mut page).unwrap();
        assert_eq!(stack.undo_description(), Some("set_field"));

        assert!(stack.undo(&mut page).unwrap());
        assert!(page.get(&BlockId::from("a")).unwrap().field("text").is_none());
        assert_eq!(stack.redo_description(), Some("set_field"));

        assert!(stack.redo(&mut page).unwrap());
        assert_eq!(
            page.get(&BlockId::from("a")).unwrap().field("text"),
            Some(&FieldValue::text("World"))
        );
    }

    #[test]
    fn test_batch_is_one_step() {
        let mut page = page();
        let mut stack = UndoStack::new();

        stack.begin_batch("Retitle", &page);
        stack.apply(set_text("a", "one"), &mut page).unwrap();
        stack.apply(set_text("b", "two"), &mut page).unwrap();
        stack.end_batch();

        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Retitle"));

        stack.undo(&mut page).unwrap();
        assert!(page.blocks().iter().all(|block| block.fields.is_empty()));
    }

    #[test]
    fn test_empty_batch_records_nothing() {
        let page = page();
        let mut stack = UndoStack::new();
        stack.begin_batch("Nothing", &page);
        stack.end_batch();
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_undo_restores_selection_of_removed_block() {
        let mut page = page();
        page.select(Some(BlockId::from("b"))).unwrap();
        let mut stack = UndoStack::new();

        stack
            .apply(Mutation::RemoveBlock { block_id: BlockId::from("b") }, &mut page)
            .unwrap();
        page.repair_selection();
        assert!(page.selection().is_none());

        stack.undo(&mut page).unwrap();
        assert_eq!(page.selection(), Some(&BlockId::from("b")));
    }

    #[test]
    fn test_new_step_drops_redo_branch() {
        let mut page = page();
        let mut stack = UndoStack::new();

        stack.apply(set_text("a", "one"), &mut page).unwrap();
        stack.undo(&mut page).unwrap();
        assert_eq!(stack.redo_levels(), 1);

        stack.apply(set_text("a", "two"), &mut page).unwrap();
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_unlimited_levels() {
        let mut page = page();
        let mut stack = UndoStack::with_max_levels(0);
        for i in 0..150 {
            stack.apply(set_text("a", &format!("v{i}")), &mut page).unwrap();
        }
        assert_eq!(stack.undo_levels(), 150);
    }
}
