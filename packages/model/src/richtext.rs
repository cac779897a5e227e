//! # Rich-text document tree
//!
//! An ordered forest of containers and leaves. Every node carries a
//! [`NodeId`] unique within its field; positions are expressed as a node-id
//! path plus a character offset ([`TextPoint`]) so they survive re-renders
//! that replace the DOM nodes but keep the model nodes.

use crate::error::{ModelError, ModelResult};
use crate::ids::{IdGenerator, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::mem;

/// Inline formatting mark on a leaf
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "mark", rename_all = "snake_case")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Link { href: String },
}

impl Mark {
    fn same_kind(&self, other: &Mark) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RichNode {
    Container {
        id: NodeId,
        tag: String,
        #[serde(default)]
        children: Vec<RichNode>,
    },
    Leaf {
        id: NodeId,
        text: String,
        #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
        marks: BTreeSet<Mark>,
    },
}

impl RichNode {
    pub fn leaf(id: impl Into<String>, text: impl Into<String>) -> Self {
        RichNode::Leaf {
            id: NodeId::new(id),
            text: text.into(),
            marks: BTreeSet::new(),
        }
    }

    pub fn container(id: impl Into<String>, tag: impl Into<String>, children: Vec<RichNode>) -> Self {
        RichNode::Container {
            id: NodeId::new(id),
            tag: tag.into(),
            children,
        }
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        if let RichNode::Leaf { ref mut marks, .. } = self {
            marks.insert(mark);
        }
        self
    }

    pub fn id(&self) -> &NodeId {
        match self {
            RichNode::Container { id, .. } | RichNode::Leaf { id, .. } => id,
        }
    }

    pub fn children(&self) -> &[RichNode] {
        match self {
            RichNode::Container { children, .. } => children,
            RichNode::Leaf { .. } => &[],
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, RichNode::Leaf { .. })
    }

    pub fn marks(&self) -> Option<&BTreeSet<Mark>> {
        match self {
            RichNode::Leaf { marks, .. } => Some(marks),
            RichNode::Container { .. } => None,
        }
    }

    /// Length in characters of all text below this node
    pub fn text_len(&self) -> usize {
        match self {
            RichNode::Leaf { text, .. } => text.chars().count(),
            RichNode::Container { children, .. } => children.iter().map(RichNode::text_len).sum(),
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RichNode::Leaf { text, .. } => out.push_str(text),
            RichNode::Container { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// A caret position: node-id path from a root node plus a character offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPoint {
    pub path: Vec<NodeId>,
    pub offset: usize,
}

impl TextPoint {
    pub fn new(path: Vec<NodeId>, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Node the point lives in (last path segment)
    pub fn node_id(&self) -> Option<&NodeId> {
        self.path.last()
    }
}

/// Outcome of re-resolving a point against a (possibly changed) document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPoint {
    pub point: TextPoint,
    /// False when the original node is gone and an ancestor was used
    pub exact: bool,
}

#[derive(Debug)]
struct LeafSpan {
    path: Vec<NodeId>,
    start: usize,
    len: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub nodes: Vec<RichNode>,
}

impl RichText {
    pub fn new(nodes: Vec<RichNode>) -> Self {
        Self { nodes }
    }

    /// Single paragraph holding one leaf
    pub fn paragraph(ids: &mut IdGenerator, text: &str) -> Self {
        let leaf = RichNode::Leaf {
            id: ids.new_node_id(),
            text: text.to_string(),
            marks: BTreeSet::new(),
        };
        Self {
            nodes: vec![RichNode::Container {
                id: ids.new_node_id(),
                tag: "p".to_string(),
                children: vec![leaf],
            }],
        }
    }

    /// Node-id generator that will not collide with ids in this document
    pub fn id_generator(&self, seed: &str) -> IdGenerator {
        let mut ids = IdGenerator::from_seed(seed);
        ids.reserve_all(self.node_ids().into_iter().map(|id| id.as_str().to_string()));
        ids
    }

    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            node.collect_text(&mut out);
        }
        out
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        fn walk(nodes: &[RichNode], out: &mut Vec<NodeId>) {
            for node in nodes {
                out.push(node.id().clone());
                walk(node.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Check that node ids are unique within the document
    pub fn validate(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for id in self.node_ids() {
            if !seen.insert(id.clone()) {
                return Err(ModelError::DuplicateNodeId(id.to_string()));
            }
        }
        Ok(())
    }

    pub fn find(&self, id: &NodeId) -> Option<&RichNode> {
        fn walk<'a>(nodes: &'a [RichNode], id: &NodeId) -> Option<&'a RichNode> {
            for node in nodes {
                if node.id() == id {
                    return Some(node);
                }
                if let Some(found) = walk(node.children(), id) {
                    return Some(found);
                }
            }
            None
        }
        walk(&self.nodes, id)
    }

    /// Node-id path from a root node down to `id`
    pub fn path_to(&self, id: &NodeId) -> Option<Vec<NodeId>> {
        fn walk(nodes: &[RichNode], id: &NodeId, prefix: &mut Vec<NodeId>) -> bool {
            for node in nodes {
                prefix.push(node.id().clone());
                if node.id() == id || walk(node.children(), id, prefix) {
                    return true;
                }
                prefix.pop();
            }
            false
        }
        let mut prefix = Vec::new();
        walk(&self.nodes, id, &mut prefix).then_some(prefix)
    }

    /// Follow a path segment by segment
    pub fn resolve_path(&self, path: &[NodeId]) -> Option<&RichNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.iter().find(|n| n.id() == first)?;
        for id in rest {
            node = node.children().iter().find(|n| n.id() == id)?;
        }
        Some(node)
    }

    /// Re-resolve a point after the document changed.
    ///
    /// Identity is the node id: if the node moved (gained or lost a wrapper)
    /// the point follows it. If the node is gone the point falls back to the
    /// nearest surviving ancestor at offset 0.
    pub fn resolve_point(&self, point: &TextPoint) -> ResolvedPoint {
        if let Some(node) = self.resolve_path(&point.path) {
            return ResolvedPoint {
                point: TextPoint::new(point.path.clone(), point.offset.min(node.text_len())),
                exact: true,
            };
        }

        if let Some(last) = point.path.last() {
            if let (Some(path), Some(node)) = (self.path_to(last), self.find(last)) {
                return ResolvedPoint {
                    point: TextPoint::new(path, point.offset.min(node.text_len())),
                    exact: true,
                };
            }
        }

        for ancestor in point.path.iter().rev().skip(1) {
            if let Some(path) = self.path_to(ancestor) {
                return ResolvedPoint {
                    point: TextPoint::new(path, 0),
                    exact: false,
                };
            }
        }

        let path = self
            .leaves()
            .into_iter()
            .next()
            .map(|leaf| leaf.path)
            .unwrap_or_default();
        ResolvedPoint {
            point: TextPoint::new(path, 0),
            exact: false,
        }
    }

    fn leaves(&self) -> Vec<LeafSpan> {
        let mut out = Vec::new();
        collect_leaves(&self.nodes, &mut Vec::new(), &mut 0, &mut out);
        out
    }

    /// Characters of text preceding the node at `path`
    fn node_start(&self, path: &[NodeId]) -> Option<usize> {
        let mut start = 0;
        let mut nodes = self.nodes.as_slice();
        for id in path {
            let index = nodes.iter().position(|node| node.id() == id)?;
            start += nodes[..index].iter().map(RichNode::text_len).sum::<usize>();
            nodes = nodes[index].children();
        }
        Some(start)
    }

    /// Character offset of a point from the start of the document
    pub fn global_offset(&self, point: &TextPoint) -> ModelResult<usize> {
        let node = self.resolve_path(&point.path).ok_or_else(|| {
            ModelError::NodeNotFound(point.node_id().map(|id| id.to_string()).unwrap_or_default())
        })?;
        let len = node.text_len();
        if point.offset > len {
            return Err(ModelError::OffsetOutOfRange {
                node: node.id().to_string(),
                offset: point.offset,
                len,
            });
        }

        let start = self
            .node_start(&point.path)
            .ok_or_else(|| ModelError::NodeNotFound(node.id().to_string()))?;
        Ok(start + point.offset)
    }

    /// Leaf point for a document-level character offset.
    ///
    /// An offset on the boundary between two leaves belongs to the earlier one.
    pub fn point_at(&self, global: usize) -> TextPoint {
        let leaves = self.leaves();
        leaves
            .iter()
            .find(|leaf| global <= leaf.start + leaf.len)
            .or(leaves.last())
            .map(|leaf| TextPoint::new(leaf.path.clone(), global.saturating_sub(leaf.start).min(leaf.len)))
            .unwrap_or_default()
    }

    /// Leaf holding the caret of `point`.
    ///
    /// A point on a container counts its offset within that container's own
    /// leaves and never leaves the container. At the boundary between two
    /// leaves it stays in the earlier one. None when the container holds no
    /// leaf.
    fn locate_leaf(&self, point: &TextPoint) -> ModelResult<Option<TextPoint>> {
        let node = self.resolve_path(&point.path).ok_or_else(|| {
            ModelError::NodeNotFound(point.node_id().map(|id| id.to_string()).unwrap_or_default())
        })?;
        if node.is_leaf() {
            return Ok(Some(point.clone()));
        }

        let mut leaves = Vec::new();
        collect_leaves(node.children(), &mut point.path.clone(), &mut 0, &mut leaves);
        Ok(leaves
            .iter()
            .find(|leaf| point.offset <= leaf.start + leaf.len)
            .or(leaves.last())
            .map(|leaf| TextPoint::new(leaf.path.clone(), point.offset.saturating_sub(leaf.start).min(leaf.len))))
    }

    /// Like `locate_leaf`, but an empty container gets a fresh empty leaf
    fn caret_leaf(&mut self, point: &TextPoint) -> ModelResult<TextPoint> {
        if let Some(leaf) = self.locate_leaf(point)? {
            return Ok(leaf);
        }

        let container = point.node_id().map(|id| id.to_string()).unwrap_or_default();
        let id = self.id_generator(&container).new_node_id();
        match self.node_mut(&point.path) {
            Some(RichNode::Container { children, .. }) => children.push(RichNode::Leaf {
                id: id.clone(),
                text: String::new(),
                marks: BTreeSet::new(),
            }),
            _ => return Err(ModelError::NotALeaf(container)),
        }

        let mut path = point.path.clone();
        path.push(id);
        Ok(TextPoint::new(path, 0))
    }

    fn node_mut(&mut self, path: &[NodeId]) -> Option<&mut RichNode> {
        fn walk<'a>(nodes: &'a mut [RichNode], path: &[NodeId]) -> Option<&'a mut RichNode> {
            let (first, rest) = path.split_first()?;
            let node = nodes.iter_mut().find(|n| n.id() == first)?;
            if rest.is_empty() {
                return Some(node);
            }
            match node {
                RichNode::Container { children, .. } => walk(children, rest),
                RichNode::Leaf { .. } => None,
            }
        }
        walk(&mut self.nodes, path)
    }

    fn leaf_mut(&mut self, id: &NodeId) -> Option<(&mut String, &mut BTreeSet<Mark>)> {
        fn walk<'a>(nodes: &'a mut [RichNode], id: &NodeId) -> Option<(&'a mut String, &'a mut BTreeSet<Mark>)> {
            for node in nodes {
                match node {
                    RichNode::Leaf { id: leaf_id, text, marks } if leaf_id == id => {
                        return Some((text, marks));
                    }
                    RichNode::Container { children, .. } => {
                        if let Some(found) = walk(children, id) {
                            return Some(found);
                        }
                    }
                    RichNode::Leaf { .. } => {}
                }
            }
            None
        }
        walk(&mut self.nodes, id)
    }

    /// Insert text at a point; returns the caret after the inserted text
    pub fn insert_text(&mut self, point: &TextPoint, inserted: &str) -> ModelResult<TextPoint> {
        let point = self.caret_leaf(point)?;
        let id = point
            .node_id()
            .cloned()
            .ok_or_else(|| ModelError::NodeNotFound(String::new()))?;
        let (text, _) = self
            .leaf_mut(&id)
            .ok_or_else(|| ModelError::NotALeaf(id.to_string()))?;

        let len = text.chars().count();
        if point.offset > len {
            return Err(ModelError::OffsetOutOfRange {
                node: id.to_string(),
                offset: point.offset,
                len,
            });
        }
        text.insert_str(byte_index(text, point.offset), inserted);

        Ok(TextPoint::new(point.path, point.offset + inserted.chars().count()))
    }

    /// Remove up to `count` characters before the point.
    ///
    /// Deletion crosses leaf starts but never the start of the point's
    /// top-level node. The caret keeps its leaf.
    pub fn delete_backward(&mut self, point: &TextPoint, count: usize) -> ModelResult<TextPoint> {
        let Some(point) = self.locate_leaf(point)? else {
            return Ok(point.clone());
        };
        let top = point.path.first().cloned();
        let spans: Vec<LeafSpan> = self
            .leaves()
            .into_iter()
            .filter(|leaf| leaf.path.first() == top.as_ref())
            .collect();
        let current = spans
            .iter()
            .position(|leaf| leaf.path == point.path)
            .ok_or_else(|| ModelError::NotALeaf(point.node_id().map(|id| id.to_string()).unwrap_or_default()))?;

        let mut caret = point.offset.min(spans[current].len);
        let mut remaining = count;
        for (index, span) in spans[..=current].iter().enumerate().rev() {
            if remaining == 0 {
                break;
            }
            let end = if index == current { caret } else { span.len };
            let start = end.saturating_sub(remaining);
            remaining -= end - start;
            if index == current {
                caret = start;
            }
            let Some(id) = span.path.last() else { continue };
            if let Some((text, _)) = self.leaf_mut(id) {
                let (from, to) = (byte_index(text, start), byte_index(text, end));
                text.replace_range(from..to, "");
            }
        }

        Ok(TextPoint::new(point.path, caret))
    }

    /// Toggle a mark over the range between two points.
    ///
    /// Leaves are split at the range boundaries; the left part of a split
    /// keeps its id and right parts get fresh ids from `ids`. The mark is
    /// removed when every covered leaf already has it, otherwise added.
    /// Returns the covered range as (start, end) points.
    pub fn toggle_mark(
        &mut self,
        anchor: &TextPoint,
        focus: &TextPoint,
        mark: &Mark,
        ids: &mut IdGenerator,
    ) -> ModelResult<(TextPoint, TextPoint)> {
        let a = self.global_offset(anchor)?;
        let f = self.global_offset(focus)?;
        let (start, end) = if a <= f { (a, f) } else { (f, a) };

        if start == end {
            let point = self.locate_leaf(anchor)?.unwrap_or_else(|| anchor.clone());
            return Ok((point.clone(), point));
        }

        self.split_at(end, ids);
        self.split_at(start, ids);

        let covered: Vec<LeafSpan> = self
            .leaves()
            .into_iter()
            .filter(|leaf| leaf.len > 0 && leaf.start >= start && leaf.start + leaf.len <= end)
            .collect();

        let all_marked = covered.iter().all(|leaf| {
            leaf.path
                .last()
                .and_then(|id| self.find(id))
                .and_then(RichNode::marks)
                .is_some_and(|marks| marks.contains(mark))
        });

        for leaf in &covered {
            let Some(id) = leaf.path.last() else { continue };
            if let Some((_, marks)) = self.leaf_mut(id) {
                if all_marked {
                    marks.remove(mark);
                } else {
                    marks.retain(|m| !m.same_kind(mark));
                    marks.insert(mark.clone());
                }
            }
        }

        match (covered.first(), covered.last()) {
            (Some(first), Some(last)) => Ok((
                TextPoint::new(first.path.clone(), 0),
                TextPoint::new(last.path.clone(), last.len),
            )),
            _ => {
                let point = self.point_at(start);
                Ok((point.clone(), point))
            }
        }
    }

    fn split_at(&mut self, global: usize, ids: &mut IdGenerator) {
        let target = self
            .leaves()
            .into_iter()
            .find(|leaf| global > leaf.start && global < leaf.start + leaf.len);

        if let Some(leaf) = target {
            if let Some(id) = leaf.path.last() {
                let new_id = ids.new_node_id();
                split_leaf_in(&mut self.nodes, id, global - leaf.start, &new_id);
            }
        }
    }
}

fn collect_leaves(nodes: &[RichNode], prefix: &mut Vec<NodeId>, pos: &mut usize, out: &mut Vec<LeafSpan>) {
    for node in nodes {
        prefix.push(node.id().clone());
        match node {
            RichNode::Leaf { text, .. } => {
                let len = text.chars().count();
                out.push(LeafSpan {
                    path: prefix.clone(),
                    start: *pos,
                    len,
                });
                *pos += len;
            }
            RichNode::Container { children, .. } => collect_leaves(children, prefix, pos, out),
        }
        prefix.pop();
    }
}

fn split_leaf_in(nodes: &mut Vec<RichNode>, target: &NodeId, at: usize, new_id: &NodeId) -> bool {
    for i in 0..nodes.len() {
        let tail = match &mut nodes[i] {
            RichNode::Leaf { id, text, marks } if id == target => {
                let rest = text.split_off(byte_index(text, at));
                Some(RichNode::Leaf {
                    id: new_id.clone(),
                    text: rest,
                    marks: marks.clone(),
                })
            }
            RichNode::Container { children, .. } => {
                if split_leaf_in(children, target, at, new_id) {
                    return true;
                }
                None
            }
            RichNode::Leaf { .. } => None,
        };

        if let Some(node) = tail {
            nodes.insert(i + 1, node);
            return true;
        }
    }
    false
}

fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RichText {
        RichText::new(vec![RichNode::container(
            "p1",
            "p",
            vec![RichNode::leaf("t1", "Hello "), RichNode::leaf("t2", "world")],
        )])
    }

    fn point(path: &[&str], offset: usize) -> TextPoint {
        TextPoint::new(path.iter().map(|s| NodeId::from(*s)).collect(), offset)
    }

    #[test]
    fn test_resolve_existing_point() {
        let doc = sample();
        let resolved = doc.resolve_point(&point(&["p1", "t2"], 3));
        assert!(resolved.exact);
        assert_eq!(resolved.point, point(&["p1", "t2"], 3));
    }

    #[test]
    fn test_resolve_follows_node_into_new_wrapper() {
        let doc = RichText::new(vec![RichNode::container(
            "p1",
            "p",
            vec![
                RichNode::leaf("t1", "Hello "),
                RichNode::container("em1", "em", vec![RichNode::leaf("t2", "world")]),
            ],
        )]);

        let resolved = doc.resolve_point(&point(&["p1", "t2"], 2));
        assert!(resolved.exact);
        assert_eq!(resolved.point, point(&["p1", "em1", "t2"], 2));
    }

    #[test]
    fn test_resolve_falls_back_to_surviving_ancestor() {
        let doc = RichText::new(vec![RichNode::container(
            "p1",
            "p",
            vec![RichNode::leaf("t1", "Hello ")],
        )]);

        let resolved = doc.resolve_point(&point(&["p1", "t2"], 4));
        assert!(!resolved.exact);
        assert_eq!(resolved.point, point(&["p1"], 0));
    }

    #[test]
    fn test_insert_text_advances_caret() {
        let mut doc = sample();
        let caret = doc.insert_text(&point(&["p1", "t1"], 5), ",").unwrap();
        assert_eq!(caret, point(&["p1", "t1"], 6));
        assert_eq!(doc.plain_text(), "Hello, world");
    }

    #[test]
    fn test_insert_into_container_lands_in_leaf() {
        let mut doc = sample();
        let caret = doc.insert_text(&point(&["p1"], 8), "!").unwrap();
        assert_eq!(caret, point(&["p1", "t2"], 3));
        assert_eq!(doc.plain_text(), "Hello wo!rld");
    }

    fn two_paragraphs() -> RichText {
        RichText::new(vec![
            RichNode::container("p1", "p", vec![RichNode::leaf("t1", "ab")]),
            RichNode::container("p2", "p", vec![RichNode::leaf("t2", "cd")]),
        ])
    }

    #[test]
    fn test_insert_at_paragraph_end_stays_in_paragraph() {
        let mut doc = two_paragraphs();
        let caret = doc.insert_text(&point(&["p1"], 2), "X").unwrap();
        assert_eq!(caret, point(&["p1", "t1"], 3));
        assert_eq!(doc.plain_text(), "abX\ncd");

        let caret = doc.insert_text(&caret, "Y").unwrap();
        assert_eq!(caret, point(&["p1", "t1"], 4));
        assert_eq!(doc.plain_text(), "abXY\ncd");
    }

    #[test]
    fn test_leaf_boundary_belongs_to_earlier_leaf() {
        let mut doc = sample();
        let caret = doc.insert_text(&point(&["p1"], 6), "big ").unwrap();
        assert_eq!(caret, point(&["p1", "t1"], 10));
        assert_eq!(doc.plain_text(), "Hello big world");
        assert_eq!(two_paragraphs().point_at(2), point(&["p1", "t1"], 2));
    }

    #[test]
    fn test_insert_into_empty_container_creates_leaf() {
        let mut doc = RichText::new(vec![
            RichNode::container("p1", "p", vec![RichNode::leaf("t1", "ab")]),
            RichNode::container("p2", "p", vec![]),
        ]);

        let caret = doc.insert_text(&point(&["p2"], 0), "X").unwrap();
        assert_eq!(caret.path.len(), 2);
        assert_eq!(caret.path[0].as_str(), "p2");
        assert_eq!(caret.offset, 1);
        assert_eq!(doc.plain_text(), "ab\nX");
        assert!(doc.validate().is_ok());

        let caret = doc.insert_text(&caret, "Y").unwrap();
        assert_eq!(caret.offset, 2);
        assert_eq!(doc.plain_text(), "ab\nXY");
    }

    #[test]
    fn test_global_offset_of_empty_container() {
        let doc = RichText::new(vec![
            RichNode::container("p1", "p", vec![RichNode::leaf("t1", "ab")]),
            RichNode::container("p2", "p", vec![]),
        ]);
        assert_eq!(doc.global_offset(&point(&["p2"], 0)), Ok(2));
    }

    #[test]
    fn test_delete_backward_crosses_leaf_start() {
        let mut doc = sample();
        let caret = doc.delete_backward(&point(&["p1", "t2"], 1), 3).unwrap();
        assert_eq!(caret, point(&["p1", "t2"], 0));
        assert_eq!(doc.plain_text(), "Hellorld");
    }

    #[test]
    fn test_delete_backward_stops_at_paragraph_start() {
        let mut doc = two_paragraphs();
        let caret = doc.delete_backward(&point(&["p2", "t2"], 1), 5).unwrap();
        assert_eq!(caret, point(&["p2", "t2"], 0));
        assert_eq!(doc.plain_text(), "ab\nd");
    }

    #[test]
    fn test_delete_backward() {
        let mut doc = sample();
        let caret = doc.delete_backward(&point(&["p1", "t2"], 5), 2).unwrap();
        assert_eq!(caret, point(&["p1", "t2"], 3));
        assert_eq!(doc.plain_text(), "Hello wor");
    }

    #[test]
    fn test_toggle_mark_splits_leaf() {
        let mut doc = sample();
        let mut ids = doc.id_generator("n");

        let (start, end) = doc
            .toggle_mark(&point(&["p1", "t2"], 1), &point(&["p1", "t2"], 4), &Mark::Bold, &mut ids)
            .unwrap();

        // "w" | "orl" | "d"
        let children = doc.nodes[0].children();
        assert_eq!(children.len(), 4);
        assert_eq!(children[1].id().as_str(), "t2");
        assert!(children[2].marks().unwrap().contains(&Mark::Bold));
        assert!(!children[1].marks().unwrap().contains(&Mark::Bold));
        assert_eq!(start.offset, 0);
        assert_eq!(end.offset, 3);
        assert_eq!(doc.plain_text(), "Hello world");
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_toggle_mark_twice_removes_it() {
        let mut doc = sample();
        let mut ids = doc.id_generator("n");
        let anchor = point(&["p1", "t1"], 0);
        let focus = point(&["p1", "t2"], 5);

        doc.toggle_mark(&anchor, &focus, &Mark::Italic, &mut ids).unwrap();
        assert!(doc.nodes[0]
            .children()
            .iter()
            .all(|leaf| leaf.marks().unwrap().contains(&Mark::Italic)));

        doc.toggle_mark(&anchor, &focus, &Mark::Italic, &mut ids).unwrap();
        assert!(doc.nodes[0]
            .children()
            .iter()
            .all(|leaf| leaf.marks().unwrap().is_empty()));
    }

    #[test]
    fn test_link_mark_replaces_previous_href() {
        let mut doc = sample();
        let mut ids = doc.id_generator("n");
        let anchor = point(&["p1", "t2"], 0);
        let focus = point(&["p1", "t2"], 5);

        let old = Mark::Link { href: "/old".to_string() };
        let new = Mark::Link { href: "/new".to_string() };
        doc.toggle_mark(&anchor, &focus, &old, &mut ids).unwrap();
        doc.toggle_mark(&anchor, &focus, &new, &mut ids).unwrap();

        let marks = doc.find(&NodeId::from("t2")).unwrap().marks().unwrap();
        assert_eq!(marks.len(), 1);
        assert!(marks.contains(&new));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let doc = RichText::new(vec![RichNode::leaf("a", "x"), RichNode::leaf("a", "y")]);
        assert_eq!(doc.validate(), Err(ModelError::DuplicateNodeId("a".to_string())));
    }
}
