//! Longer mutation chains through the undo stack
//!
//! This tests:
//! - Move + field + remove chains
//! - Undo/redo sequences
//! - Batched mutations
//! - Page integrity after operations

use blockframe_editor::{Mutation, MutationError, Page, UndoStack};
use blockframe_model::{Block, BlockId, BlockType, FieldValue};

fn page() -> Page {
    let blocks = (0..5)
        .map(|i| Block::new(format!("b{i}").as_str(), BlockType::Text).with_field("text", FieldValue::text(format!("v{i}"))))
        .collect();
    Page::new("/sequences", blocks).unwrap()
}

fn order(page: &Page) -> Vec<String> {
    page.order().iter().map(ToString::to_string).collect()
}

#[test]
fn test_move_then_remove_then_undo_both() {
    let mut page = page();
    let mut stack = UndoStack::new();

    stack
        .apply(
            Mutation::MoveBlocks {
                block_ids: vec![BlockId::from("b3"), BlockId::from("b4")],
                to_index: 0,
            },
            &mut page,
        )
        .unwrap();
    assert_eq!(order(&page), vec!["b3", "b4", "b0", "b1", "b2"]);

    stack
        .apply(Mutation::RemoveBlock { block_id: BlockId::from("b4") }, &mut page)
        .unwrap();
    assert_eq!(order(&page), vec!["b3", "b0", "b1", "b2"]);

    stack.undo(&mut page).unwrap();
    assert_eq!(order(&page), vec!["b3", "b4", "b0", "b1", "b2"]);

    stack.undo(&mut page).unwrap();
    assert_eq!(order(&page), vec!["b0", "b1", "b2", "b3", "b4"]);
}

#[test]
fn test_multiple_field_updates_with_undo_redo() {
    let mut page = page();
    let mut stack = UndoStack::new();
    let id = BlockId::from("b0");

    for i in 1..=5 {
        stack
            .apply(
                Mutation::SetField {
                    block_id: id.clone(),
                    field: "text".to_string(),
                    value: FieldValue::text(format!("edit {i}")),
                },
                &mut page,
            )
            .unwrap();
    }
    assert_eq!(stack.undo_levels(), 5);

    for _ in 0..3 {
        stack.undo(&mut page).unwrap();
    }
    assert_eq!(page.get(&id).unwrap().field("text"), Some(&FieldValue::text("edit 2")));
    assert_eq!(stack.redo_levels(), 3);

    stack.redo(&mut page).unwrap();
    assert_eq!(page.get(&id).unwrap().field("text"), Some(&FieldValue::text("edit 3")));

    // a new edit discards the remaining redo history
    stack
        .apply(
            Mutation::RemoveField {
                block_id: id.clone(),
                field: "text".to_string(),
            },
            &mut page,
        )
        .unwrap();
    assert!(!stack.can_redo());
    assert!(page.get(&id).unwrap().field("text").is_none());

    stack.undo(&mut page).unwrap();
    assert_eq!(page.get(&id).unwrap().field("text"), Some(&FieldValue::text("edit 3")));
}

#[test]
fn test_batch_undoes_as_one_step() {
    let mut page = page();
    let original = page.blocks().to_vec();
    let mut stack = UndoStack::new();

    stack.begin_batch("Clear page", &page);
    for id in page.order() {
        stack.apply(Mutation::RemoveBlock { block_id: id }, &mut page).unwrap();
    }
    stack.end_batch();

    assert!(page.is_empty());
    assert_eq!(stack.undo_levels(), 1);
    assert_eq!(stack.undo_description(), Some("Clear page"));

    stack.undo(&mut page).unwrap();
    assert_eq!(page.blocks(), original.as_slice());

    stack.redo(&mut page).unwrap();
    assert!(page.is_empty());
}

#[test]
fn test_failed_mutation_leaves_page_and_history_alone() {
    let mut page = page();
    let before = page.blocks().to_vec();
    let mut stack = UndoStack::new();

    let result = stack.apply(
        Mutation::InsertBlock {
            index: 2,
            block: Block::new("b1", BlockType::Text),
        },
        &mut page,
    );
    assert_eq!(result, Err(MutationError::DuplicateId(BlockId::from("b1"))));

    let result = stack.apply(
        Mutation::MoveBlocks {
            block_ids: vec![BlockId::from("b0"), BlockId::from("b2")],
            to_index: 0,
        },
        &mut page,
    );
    assert!(matches!(result, Err(MutationError::InvalidStructure(_))));

    assert_eq!(page.blocks(), before.as_slice());
    assert!(!stack.can_undo());
}

#[test]
fn test_aborted_batch_rolls_back() {
    let mut page = page();
    let before = page.blocks().to_vec();
    let mut stack = UndoStack::new();

    stack.begin_batch("Partial", &page);
    stack
        .apply(Mutation::RemoveBlock { block_id: BlockId::from("b0") }, &mut page)
        .unwrap();
    stack
        .apply(
            Mutation::InsertBlock {
                index: 0,
                block: Block::new("fresh", BlockType::Title),
            },
            &mut page,
        )
        .unwrap();
    stack.abort_batch(&mut page).unwrap();

    assert_eq!(page.blocks(), before.as_slice());
    assert!(!stack.can_undo());
}

#[test]
fn test_history_is_capped() {
    let mut page = page();
    let mut stack = UndoStack::with_max_levels(3);

    for i in 0..6 {
        stack
            .apply(
                Mutation::SetField {
                    block_id: BlockId::from("b2"),
                    field: "text".to_string(),
                    value: FieldValue::text(format!("n{i}")),
                },
                &mut page,
            )
            .unwrap();
    }

    assert_eq!(stack.undo_levels(), 3);
    while stack.undo(&mut page).unwrap() {}
    assert_eq!(page.get(&BlockId::from("b2")).unwrap().field("text"), Some(&FieldValue::text("n2")));
}
