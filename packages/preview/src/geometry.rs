//! Block geometry.
//!
//! A block may render as several elements (list and query blocks). Its
//! geometry is the union of every member's rectangle, and every member is
//! watched for size changes.

use crate::binding::BindingResolver;
use crate::dom::{DomView, ElementRef};
use blockframe_model::BlockId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.top() && y <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// Union of the rectangles of all elements, or None for an empty set
pub fn combined_rect<D: DomView>(dom: &D, elements: &[ElementRef]) -> Option<Rect> {
    elements
        .iter()
        .map(|el| dom.bounding_rect(*el))
        .reduce(|acc, rect| acc.union(&rect))
}

/// Watches every element of each observed block for size changes
#[derive(Debug, Default)]
pub struct ResizeWatch {
    watched: BTreeMap<BlockId, Vec<(ElementRef, Rect)>>,
}

impl ResizeWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<D: DomView>(&mut self, dom: &D, block_id: &BlockId) {
        let entries = snapshot(dom, block_id);
        self.watched.insert(block_id.clone(), entries);
    }

    pub fn unobserve(&mut self, block_id: &BlockId) {
        self.watched.remove(block_id);
    }

    pub fn watched_elements(&self, block_id: &BlockId) -> Vec<ElementRef> {
        self.watched
            .get(block_id)
            .map(|entries| entries.iter().map(|(el, _)| *el).collect())
            .unwrap_or_default()
    }

    /// Blocks whose member set or any member's rectangle changed since the
    /// last poll, with their recomputed union
    pub fn poll<D: DomView>(&mut self, dom: &D) -> Vec<(BlockId, Rect)> {
        let mut changed = Vec::new();

        for (block_id, entries) in self.watched.iter_mut() {
            let current = snapshot(dom, block_id);
            if current != *entries {
                let elements: Vec<ElementRef> = current.iter().map(|(el, _)| *el).collect();
                if let Some(rect) = combined_rect(dom, &elements) {
                    changed.push((block_id.clone(), rect));
                }
                *entries = current;
            }
        }

        changed
    }
}

fn snapshot<D: DomView>(dom: &D, block_id: &BlockId) -> Vec<(ElementRef, Rect)> {
    BindingResolver::new(dom)
        .block_elements(block_id)
        .into_iter()
        .map(|el| (el, dom.bounding_rect(el)))
        .collect()
}
