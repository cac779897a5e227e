//! # DOM view
//!
//! The preview's markup is produced by a foreign renderer. Everything here
//! reads it through [`DomView`], so the binding and selection logic works
//! the same against a live document or the in-memory [`VirtualDom`] used
//! by hosts without a browser and by the tests.

use crate::geometry::Rect;
use std::collections::BTreeMap;

/// Handle to a node in a [`DomView`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub usize);

/// A browser-level selection endpoint: a node plus a character offset.
///
/// For text nodes the offset counts characters; for elements it counts
/// characters of the element's text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomPoint {
    pub node: ElementRef,
    pub offset: usize,
}

impl DomPoint {
    pub fn new(node: ElementRef, offset: usize) -> Self {
        Self { node, offset }
    }
}

pub trait DomView {
    fn root(&self) -> ElementRef;

    fn parent(&self, node: ElementRef) -> Option<ElementRef>;

    fn children(&self, node: ElementRef) -> Vec<ElementRef>;

    fn attribute(&self, node: ElementRef, name: &str) -> Option<String>;

    /// Character data for text nodes, None for elements
    fn text(&self, node: ElementRef) -> Option<String>;

    fn bounding_rect(&self, node: ElementRef) -> Rect;

    fn set_attribute(&mut self, node: ElementRef, name: &str, value: &str);

    fn remove_attribute(&mut self, node: ElementRef, name: &str);

    fn is_text(&self, node: ElementRef) -> bool {
        self.text(node).is_some()
    }

    fn has_attribute(&self, node: ElementRef, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Pre-order descendants, not including `node`
    fn descendants(&self, node: ElementRef) -> Vec<ElementRef> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementRef> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Elements carrying `name` (optionally equal to `value`), in document order
    fn query_all(&self, name: &str, value: Option<&str>) -> Vec<ElementRef> {
        self.descendants(self.root())
            .into_iter()
            .filter(|el| match (self.attribute(*el, name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// `node` or its nearest ancestor carrying `name`
    fn closest(&self, node: ElementRef, name: &str) -> Option<ElementRef> {
        let mut current = Some(node);
        while let Some(el) = current {
            if self.has_attribute(el, name) {
                return Some(el);
            }
            current = self.parent(el);
        }
        None
    }

    fn contains(&self, ancestor: ElementRef, node: ElementRef) -> bool {
        let mut current = Some(node);
        while let Some(el) = current {
            if el == ancestor {
                return true;
            }
            current = self.parent(el);
        }
        false
    }

    fn text_content(&self, node: ElementRef) -> String {
        if let Some(text) = self.text(node) {
            return text;
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|el| self.text(el))
            .collect()
    }

    /// Characters of `container`'s text that precede `point`
    fn text_offset_within(&self, container: ElementRef, point: DomPoint) -> usize {
        let mut offset = 0;
        for node in self.descendants(container) {
            if node == point.node {
                return offset + point.offset;
            }
            if self.contains(node, point.node) {
                continue;
            }
            if let Some(text) = self.text(node) {
                offset += text.chars().count();
            }
        }
        // point.node is the container itself
        point.offset
    }

    /// Text node and offset at a character position inside `container`
    fn point_at_offset(&self, container: ElementRef, offset: usize) -> DomPoint {
        let mut remaining = offset;
        let mut last_text = None;
        for node in self.descendants(container) {
            if let Some(text) = self.text(node) {
                let len = text.chars().count();
                if remaining <= len {
                    return DomPoint::new(node, remaining);
                }
                remaining -= len;
                last_text = Some((node, len));
            }
        }
        match last_text {
            Some((node, len)) => DomPoint::new(node, len),
            None => DomPoint::new(container, 0),
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct DomNode {
    kind: NodeKind,
    parent: Option<ElementRef>,
    children: Vec<ElementRef>,
    rect: Rect,
}

/// Arena-backed DOM
#[derive(Debug, Clone)]
pub struct VirtualDom {
    nodes: Vec<DomNode>,
}

impl Default for VirtualDom {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualDom {
    pub fn new() -> Self {
        Self {
            nodes: vec![DomNode {
                kind: NodeKind::Element {
                    tag: "body".to_string(),
                    attributes: BTreeMap::new(),
                },
                parent: None,
                children: Vec::new(),
                rect: Rect::default(),
            }],
        }
    }

    fn push(&mut self, parent: ElementRef, kind: NodeKind) -> ElementRef {
        let id = ElementRef(self.nodes.len());
        self.nodes.push(DomNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            rect: Rect::default(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: ElementRef, tag: &str, attributes: &[(&str, &str)]) -> ElementRef {
        let attributes = attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.push(
            parent,
            NodeKind::Element {
                tag: tag.to_string(),
                attributes,
            },
        )
    }

    pub fn append_text(&mut self, parent: ElementRef, text: &str) -> ElementRef {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    pub fn set_rect(&mut self, node: ElementRef, rect: Rect) {
        self.nodes[node.0].rect = rect;
    }

    pub fn set_text(&mut self, node: ElementRef, text: &str) {
        if let NodeKind::Text(ref mut current) = self.nodes[node.0].kind {
            *current = text.to_string();
        }
    }

    /// Detach all children, as a re-render of `node` would
    pub fn clear_children(&mut self, node: ElementRef) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    pub fn tag(&self, node: ElementRef) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }
}

impl DomView for VirtualDom {
    fn root(&self) -> ElementRef {
        ElementRef(0)
    }

    fn parent(&self, node: ElementRef) -> Option<ElementRef> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn children(&self, node: ElementRef) -> Vec<ElementRef> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, node: ElementRef, name: &str) -> Option<String> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    fn text(&self, node: ElementRef) -> Option<String> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element { .. } => None,
        }
    }

    fn bounding_rect(&self, node: ElementRef) -> Rect {
        self.nodes.get(node.0).map(|n| n.rect).unwrap_or_default()
    }

    fn set_attribute(&mut self, node: ElementRef, name: &str, value: &str) {
        if let Some(DomNode {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: ElementRef, name: &str) {
        if let Some(DomNode {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        {
            attributes.remove(name);
        }
    }
}
