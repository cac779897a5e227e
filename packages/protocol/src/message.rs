//! Message kinds exchanged over the channel.
//!
//! Payload field names are camelCase on the wire; the kind tag is
//! SCREAMING_SNAKE_CASE (`FIELD_UPDATE`, `FORMAT_REQUEST`, ...).

use blockframe_model::{Block, BlockId, BlockSchema, BlockType, FieldValue, InsertPosition, Mark, RichText, Selection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Full snapshot pushed from the control panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePayload {
    pub blocks: BTreeMap<BlockId, Block>,
    pub block_order: Vec<BlockId>,
    #[serde(default)]
    pub schema: Vec<BlockSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_block: Option<BlockId>,
}

impl StatePayload {
    pub fn ordered_blocks(&self) -> impl Iterator<Item = &Block> {
        self.block_order.iter().filter_map(|id| self.blocks.get(id))
    }

    pub fn contains_field(&self, block_id: &BlockId, field: &str) -> bool {
        self.blocks
            .get(block_id)
            .is_some_and(|block| block.fields.contains_key(field))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    pub block_id: BlockId,
    pub field: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatRequest {
    /// Correlates the response; responses for an abandoned request are ignored
    pub request_id: u64,
    pub block_id: BlockId,
    pub field: String,
    pub mark: Mark,
    pub selection: Selection,
    /// Current local value, so the formatting applies to what the user sees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<RichText>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatResponse {
    pub request_id: u64,
    pub block_id: BlockId,
    pub field: String,
    pub document: RichText,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum StructuralOp {
    Add {
        reference_id: BlockId,
        position: InsertPosition,
        block_type: BlockType,
    },
    Remove {
        block_id: BlockId,
    },
    /// Move a block, or with `whole_instance` the template instance it belongs to
    Move {
        block_id: BlockId,
        target_id: BlockId,
        position: InsertPosition,
        #[serde(default)]
        whole_instance: bool,
    },
    Select {
        block_id: Option<BlockId>,
    },
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub block_id: BlockId,
    /// None when a block is selected without a focused field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    InitialState(StatePayload),
    FieldUpdate(FieldUpdate),
    FormatRequest(FormatRequest),
    FormatResponse(FormatResponse),
    StructuralCommand(StructuralOp),
    SelectionReport(SelectionReport),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::InitialState(_) => "INITIAL_STATE",
            Message::FieldUpdate(_) => "FIELD_UPDATE",
            Message::FormatRequest(_) => "FORMAT_REQUEST",
            Message::FormatResponse(_) => "FORMAT_RESPONSE",
            Message::StructuralCommand(_) => "STRUCTURAL_COMMAND",
            Message::SelectionReport(_) => "SELECTION_REPORT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_update_wire_shape() {
        let message = Message::FieldUpdate(FieldUpdate {
            block_id: BlockId::from("b1"),
            field: "title".to_string(),
            value: FieldValue::text("Hi"),
        });

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["kind"], "FIELD_UPDATE");
        assert_eq!(json["payload"]["blockId"], "b1");
        assert_eq!(json["payload"]["value"]["value"], "Hi");
    }

    #[test]
    fn test_structural_command_wire_shape() {
        let message = Message::StructuralCommand(StructuralOp::Add {
            reference_id: BlockId::from("b1"),
            position: InsertPosition::After,
            block_type: BlockType::Slate,
        });

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["kind"], "STRUCTURAL_COMMAND");
        assert_eq!(json["payload"]["op"], "add");
        assert_eq!(json["payload"]["referenceId"], "b1");
        assert_eq!(json["payload"]["blockType"], "slate");
        assert_eq!(message.kind(), "STRUCTURAL_COMMAND");
    }

    #[test]
    fn test_parse_undo_command() {
        let json = r#"{ "kind": "STRUCTURAL_COMMAND", "payload": { "op": "undo" } }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message, Message::StructuralCommand(StructuralOp::Undo));
    }
}
