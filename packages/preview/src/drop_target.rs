//! Drop-target hit testing while dragging a block.
//!
//! Hit testing runs over each block's union rectangle, so the gaps between
//! sibling elements of one multi-element block never become insertion
//! points. Gaps between two adjacent locked blocks are rejected too.

use crate::binding::BindingResolver;
use crate::dom::DomView;
use crate::geometry::Rect;
use blockframe_model::{BlockId, InsertPosition};
use std::collections::HashSet;

/// Where the drop indicator is drawn and what a drop there means
#[derive(Debug, Clone, PartialEq)]
pub struct DropIndicator {
    pub target: BlockId,
    pub position: InsertPosition,
    /// Vertical coordinate of the indicator line
    pub y: f64,
}

pub fn compute_drop_target<D: DomView>(
    dom: &D,
    order: &[BlockId],
    locked: &HashSet<BlockId>,
    dragged: &BlockId,
    pointer_y: f64,
) -> Option<DropIndicator> {
    let resolver = BindingResolver::new(dom);
    let rendered: Vec<(&BlockId, Rect)> = order
        .iter()
        .filter_map(|id| resolver.block_rect(id).map(|rect| (id, rect)))
        .collect();

    if rendered.is_empty() {
        return None;
    }

    let gap = rendered
        .iter()
        .position(|(_, rect)| rect.mid_y() > pointer_y)
        .unwrap_or(rendered.len());

    let before = gap.checked_sub(1).map(|i| &rendered[i]);
    let after = rendered.get(gap);

    if let (Some((prev, _)), Some((next, _))) = (before, after) {
        if locked.contains(*prev) && locked.contains(*next) {
            return None;
        }
    }

    // dropping right next to itself is a no-op
    if before.is_some_and(|(id, _)| *id == dragged) || after.is_some_and(|(id, _)| *id == dragged) {
        return None;
    }

    match (before, after) {
        (_, Some((next, rect))) => Some(DropIndicator {
            target: (*next).clone(),
            position: InsertPosition::Before,
            y: rect.top(),
        }),
        (Some((prev, rect)), None) => Some(DropIndicator {
            target: (*prev).clone(),
            position: InsertPosition::After,
            y: rect.bottom(),
        }),
        (None, None) => None,
    }
}
