//! # DOM Binding Resolver
//!
//! Maps logical addresses (block id, field name, rich-text node id) to the
//! live elements the renderer tagged with markers, and back.

use crate::dom::{DomView, ElementRef};
use crate::error::BindingError;
use crate::geometry::{combined_rect, Rect};
use blockframe_model::{BlockId, FieldRole, NodeId};
use blockframe_protocol::markers;
use serde::{Deserialize, Serialize};

/// An editable element and the role marker it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub element: ElementRef,
    pub role: FieldRole,
}

/// Field an element belongs to, found by walking up from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHit {
    pub block_id: BlockId,
    pub field: String,
    pub binding: FieldBinding,
}

/// Which toolbar affordances a field role gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Affordances {
    pub format_buttons: bool,
    pub link_edit: bool,
    pub media_picker: bool,
}

impl Affordances {
    pub fn for_role(role: FieldRole) -> Self {
        match role {
            FieldRole::PlainText => Self::default(),
            FieldRole::RichText => Self {
                format_buttons: true,
                ..Self::default()
            },
            FieldRole::LinkTarget => Self {
                link_edit: true,
                ..Self::default()
            },
            FieldRole::MediaReference => Self {
                media_picker: true,
                ..Self::default()
            },
        }
    }
}

fn role_of<D: DomView>(dom: &D, element: ElementRef) -> Option<(FieldRole, String)> {
    markers::ROLE_MARKERS
        .iter()
        .find_map(|(role, attr)| dom.attribute(element, attr).map(|field| (*role, field)))
}

pub struct BindingResolver<'a, D: DomView> {
    dom: &'a D,
}

impl<'a, D: DomView> BindingResolver<'a, D> {
    pub fn new(dom: &'a D) -> Self {
        Self { dom }
    }

    /// Every live element belonging to a block, in document order
    pub fn block_elements(&self, block_id: &BlockId) -> Vec<ElementRef> {
        self.dom.query_all(markers::BLOCK_ID, Some(block_id.as_str()))
    }

    /// Union rectangle of all the block's elements
    pub fn block_rect(&self, block_id: &BlockId) -> Option<Rect> {
        combined_rect(self.dom, &self.block_elements(block_id))
    }

    /// Rendered blocks carrying the template-source marker
    pub fn is_locked(&self, block_id: &BlockId) -> bool {
        self.block_elements(block_id)
            .into_iter()
            .any(|el| self.dom.has_attribute(el, markers::TEMPLATE_SOURCE))
    }

    /// Block owning an element
    pub fn block_at(&self, element: ElementRef) -> Option<BlockId> {
        let el = self.dom.closest(element, markers::BLOCK_ID)?;
        self.dom.attribute(el, markers::BLOCK_ID).map(BlockId::new)
    }

    /// Editable elements for a field of a block.
    ///
    /// Fields of blocks nested inside this block are not included.
    pub fn field_bindings(&self, block_id: &BlockId, field: &str) -> Vec<FieldBinding> {
        let mut out = Vec::new();
        for block_el in self.block_elements(block_id) {
            let candidates = std::iter::once(block_el).chain(self.dom.descendants(block_el));
            for el in candidates {
                let Some((role, name)) = role_of(self.dom, el) else { continue };
                if name != field || self.block_at(el).as_ref() != Some(block_id) {
                    continue;
                }
                if !out.iter().any(|b: &FieldBinding| b.element == el) {
                    out.push(FieldBinding { element: el, role });
                }
            }
        }
        out
    }

    /// First editable element of a field
    pub fn field_root(&self, block_id: &BlockId, field: &str) -> Result<FieldBinding, BindingError> {
        if self.block_elements(block_id).is_empty() {
            return Err(BindingError::BlockNotRendered(block_id.clone()));
        }
        self.field_bindings(block_id, field)
            .into_iter()
            .next()
            .ok_or_else(|| BindingError::FieldNotRendered {
                block_id: block_id.clone(),
                field: field.to_string(),
            })
    }

    /// Field an element (or text node) sits in
    pub fn field_at(&self, element: ElementRef) -> Option<FieldHit> {
        let mut current = Some(element);
        while let Some(el) = current {
            if let Some((role, field)) = role_of(self.dom, el) {
                let block_id = self.block_at(el)?;
                return Some(FieldHit {
                    block_id,
                    field,
                    binding: FieldBinding { element: el, role },
                });
            }
            current = self.dom.parent(el);
        }
        None
    }

    /// Element rendering a rich-text node, whatever its tag
    pub fn node_element(&self, root: ElementRef, node_id: &NodeId) -> Option<ElementRef> {
        std::iter::once(root)
            .chain(self.dom.descendants(root))
            .find(|el| self.dom.attribute(*el, markers::NODE_ID).as_deref() == Some(node_id.as_str()))
    }

    /// Nearest element carrying a node id, walking up from `from` to `root`
    pub fn nearest_node(&self, root: ElementRef, from: ElementRef) -> Option<(NodeId, ElementRef)> {
        let mut current = Some(from);
        while let Some(el) = current {
            if let Some(id) = self.dom.attribute(el, markers::NODE_ID) {
                return Some((NodeId::new(id), el));
            }
            if el == root {
                break;
            }
            current = self.dom.parent(el);
        }
        None
    }

    /// Node-id path from the field root down to `element`
    pub fn node_path(&self, root: ElementRef, element: ElementRef) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(element);
        while let Some(el) = current {
            if let Some(id) = self.dom.attribute(el, markers::NODE_ID) {
                path.push(NodeId::new(id));
            }
            if el == root {
                break;
            }
            current = self.dom.parent(el);
        }
        path.reverse();
        path
    }

    /// First node-id element inside a field root
    pub fn first_node(&self, root: ElementRef) -> Option<(NodeId, ElementRef)> {
        self.dom
            .descendants(root)
            .into_iter()
            .find_map(|el| self.dom.attribute(el, markers::NODE_ID).map(|id| (NodeId::new(id), el)))
    }

    /// Text inside a rich-text field that no node-id element covers
    pub fn audit_rich_text(&self, block_id: &BlockId, field: &str) -> Vec<BindingError> {
        let mut errors = Vec::new();
        for binding in self.field_bindings(block_id, field) {
            if binding.role != FieldRole::RichText {
                continue;
            }
            let uncovered = self.dom.descendants(binding.element).into_iter().any(|el| {
                self.dom.text(el).is_some_and(|t| !t.trim().is_empty())
                    && self.nearest_node(binding.element, el).is_none()
            });
            if uncovered {
                errors.push(BindingError::MissingNodeId {
                    block_id: block_id.clone(),
                    field: field.to_string(),
                });
            }
        }
        errors
    }
}
