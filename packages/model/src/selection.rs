use crate::ids::{BlockId, NodeId};
use crate::richtext::TextPoint;
use serde::{Deserialize, Serialize};

/// Caret or range inside one field, expressed in node-id paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub block_id: BlockId,
    pub field: String,
    pub path: Vec<NodeId>,
    pub offset: usize,
    pub extent_path: Vec<NodeId>,
    pub extent_offset: usize,
}

impl Selection {
    pub fn collapsed(block_id: BlockId, field: impl Into<String>, point: TextPoint) -> Self {
        Self {
            block_id,
            field: field.into(),
            path: point.path.clone(),
            offset: point.offset,
            extent_path: point.path,
            extent_offset: point.offset,
        }
    }

    pub fn range(block_id: BlockId, field: impl Into<String>, anchor: TextPoint, extent: TextPoint) -> Self {
        Self {
            block_id,
            field: field.into(),
            path: anchor.path,
            offset: anchor.offset,
            extent_path: extent.path,
            extent_offset: extent.offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.path == self.extent_path && self.offset == self.extent_offset
    }

    pub fn anchor(&self) -> TextPoint {
        TextPoint::new(self.path.clone(), self.offset)
    }

    pub fn extent(&self) -> TextPoint {
        TextPoint::new(self.extent_path.clone(), self.extent_offset)
    }

    pub fn is_in_block(&self, id: &BlockId) -> bool {
        &self.block_id == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapsed_selection() {
        let point = TextPoint::new(vec![NodeId::from("p"), NodeId::from("t")], 2);
        let sel = Selection::collapsed(BlockId::from("b"), "value", point.clone());

        assert!(sel.is_collapsed());
        assert_eq!(sel.anchor(), point);
        assert_eq!(sel.extent(), point);
    }

    #[test]
    fn test_range_selection_wire_names() {
        let sel = Selection::range(
            BlockId::from("b"),
            "value",
            TextPoint::new(vec![NodeId::from("t")], 0),
            TextPoint::new(vec![NodeId::from("t")], 3),
        );
        assert!(!sel.is_collapsed());

        let json = serde_json::to_value(&sel).unwrap();
        assert_eq!(json["blockId"], "b");
        assert_eq!(json["extentOffset"], 3);
    }
}
