//! # Selection & cursor synchronizer
//!
//! Focus lifecycle per field:
//!
//! ```text
//! Unfocused -> Focused -> Editing -> Formatting -> Editing
//! ```
//!
//! Carets are kept as node-id paths plus character offsets, never as DOM
//! node references, so they survive the foreign renderer replacing markup.
//! Plain-text fields use an empty path and an offset into the field's text.

use crate::binding::{BindingResolver, FieldHit};
use crate::dom::{DomPoint, DomView, ElementRef};
use crate::error::BindingError;
use blockframe_model::{BlockId, FieldRole, RichText, Selection, TextPoint};
use blockframe_protocol::{markers, FormatResponse};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldAddress {
    pub block_id: BlockId,
    pub field: String,
}

impl FieldAddress {
    pub fn new(block_id: impl Into<BlockId>, field: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.block_id, self.field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Unfocused,
    Focused(FieldAddress),
    Editing(FieldAddress),
    /// Waiting for the control panel to answer a format request
    Formatting { address: FieldAddress, request_id: u64 },
}

impl FocusState {
    pub fn address(&self) -> Option<&FieldAddress> {
        match self {
            FocusState::Unfocused => None,
            FocusState::Focused(address) | FocusState::Editing(address) => Some(address),
            FocusState::Formatting { address, .. } => Some(address),
        }
    }
}

/// Result of focusing a field from a click
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub selection: Selection,
    pub role: FieldRole,
    /// Set when the click landed outside any node-id and was corrected
    pub warning: Option<BindingError>,
}

#[derive(Debug, Default)]
pub struct SelectionSync {
    state: FocusState,
    role: Option<FieldRole>,
    selection: Option<Selection>,
    next_request_id: u64,
}

impl SelectionSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub fn address(&self) -> Option<&FieldAddress> {
        self.state.address()
    }

    pub fn role(&self) -> Option<FieldRole> {
        self.role
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_formatting(&self) -> bool {
        matches!(self.state, FocusState::Formatting { .. })
    }

    /// Address of the field local keystrokes currently own
    pub fn editing(&self) -> Option<&FieldAddress> {
        match &self.state {
            FocusState::Editing(address) | FocusState::Formatting { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Focus the field under a browser selection.
    ///
    /// Leaves any previous field, abandoning an outstanding format request.
    pub fn focus<D: DomView>(
        &mut self,
        dom: &mut D,
        anchor: DomPoint,
        extent: Option<DomPoint>,
    ) -> Result<Focus, BindingError> {
        if self.is_formatting() {
            self.cancel(dom);
        }

        let hit = BindingResolver::new(&*dom)
            .field_at(anchor.node)
            .ok_or(BindingError::NotEditable)?;

        let (anchor_point, warning) = capture_point(&*dom, &hit, anchor)?;
        let extent_point = match extent {
            Some(extent) if dom.contains(hit.binding.element, extent.node) => capture_point(&*dom, &hit, extent)?.0,
            _ => anchor_point.clone(),
        };

        let selection = Selection::range(hit.block_id.clone(), hit.field.clone(), anchor_point, extent_point);
        debug!(block_id = %hit.block_id, field = %hit.field, "Focused field");

        self.state = FocusState::Focused(FieldAddress::new(hit.block_id, hit.field));
        self.role = Some(hit.binding.role);
        self.selection = Some(selection.clone());

        Ok(Focus {
            selection,
            role: hit.binding.role,
            warning,
        })
    }

    /// Update the caret from a browser selection inside the focused field
    pub fn caret_moved<D: DomView>(
        &mut self,
        dom: &D,
        anchor: DomPoint,
        extent: Option<DomPoint>,
    ) -> Result<Selection, BindingError> {
        let address = self.address().cloned().ok_or(BindingError::NotEditable)?;
        let hit = BindingResolver::new(dom)
            .field_at(anchor.node)
            .filter(|hit| hit.block_id == address.block_id && hit.field == address.field)
            .ok_or(BindingError::NotEditable)?;

        let (anchor_point, _) = capture_point(dom, &hit, anchor)?;
        let extent_point = match extent {
            Some(extent) => capture_point(dom, &hit, extent)?.0,
            None => anchor_point.clone(),
        };

        let selection = Selection::range(address.block_id, address.field, anchor_point, extent_point);
        self.selection = Some(selection.clone());
        Ok(selection)
    }

    pub fn begin_editing(&mut self) {
        if let FocusState::Focused(address) = &self.state {
            self.state = FocusState::Editing(address.clone());
        }
    }

    /// Replace the tracked selection after a local edit moved the caret
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    /// Enter `Formatting`: the field stops accepting keystrokes until the
    /// response arrives or the user leaves the field
    pub fn begin_format<D: DomView>(&mut self, dom: &mut D) -> Result<(u64, Selection), BindingError> {
        let address = match &self.state {
            FocusState::Focused(address) | FocusState::Editing(address) => address.clone(),
            _ => return Err(BindingError::NotEditable),
        };
        let selection = self.selection.clone().ok_or(BindingError::NotEditable)?;

        set_editable(dom, &address, false);

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.state = FocusState::Formatting { address, request_id };
        Ok((request_id, selection))
    }

    /// Finish a format round trip.
    ///
    /// Returns the restored selection, or None when the response belongs to
    /// a request the user already abandoned.
    pub fn complete_format<D: DomView>(&mut self, dom: &mut D, response: &FormatResponse) -> Option<Selection> {
        let address = match &self.state {
            FocusState::Formatting { address, request_id }
                if *request_id == response.request_id
                    && address.block_id == response.block_id
                    && address.field == response.field =>
            {
                address.clone()
            }
            _ => {
                debug!(request_id = response.request_id, "Ignoring stale format response");
                return None;
            }
        };

        set_editable(dom, &address, true);

        let anchor = response.document.resolve_point(&response.selection.anchor()).point;
        let extent = response.document.resolve_point(&response.selection.extent()).point;
        let selection = Selection::range(address.block_id.clone(), address.field.clone(), anchor, extent);

        self.state = FocusState::Editing(address);
        self.selection = Some(selection.clone());
        Some(selection)
    }

    /// Re-resolve the tracked selection against a replaced document.
    ///
    /// Plain-text carets are clamped to the new text length.
    pub fn reresolve(&mut self, document: Option<&RichText>, text_len: usize) -> Option<Selection> {
        let current = self.selection.as_ref()?;
        let (anchor, extent) = match document {
            Some(doc) => {
                let anchor = doc.resolve_point(&current.anchor());
                let extent = doc.resolve_point(&current.extent());
                if !anchor.exact {
                    debug!(block_id = %current.block_id, field = %current.field, "Caret node removed, using ancestor");
                }
                (anchor.point, extent.point)
            }
            None => (
                TextPoint::new(Vec::new(), current.offset.min(text_len)),
                TextPoint::new(Vec::new(), current.extent_offset.min(text_len)),
            ),
        };

        let selection = Selection::range(current.block_id.clone(), current.field.clone(), anchor, extent);
        self.selection = Some(selection.clone());
        Some(selection)
    }

    /// Map the tracked caret to a live DOM position after a re-render
    pub fn restore<D: DomView>(&self, dom: &D) -> Result<DomPoint, BindingError> {
        let selection = self.selection.as_ref().ok_or(BindingError::NotEditable)?;
        let resolver = BindingResolver::new(dom);
        let root = resolver.field_root(&selection.block_id, &selection.field)?;

        if selection.path.is_empty() {
            return Ok(dom.point_at_offset(root.element, selection.offset));
        }

        if let Some(el) = selection
            .path
            .last()
            .and_then(|id| resolver.node_element(root.element, id))
        {
            return Ok(dom.point_at_offset(el, selection.offset));
        }

        let fallback = selection
            .path
            .iter()
            .rev()
            .skip(1)
            .find_map(|id| resolver.node_element(root.element, id));

        match fallback {
            Some(el) => Ok(dom.point_at_offset(el, 0)),
            None => {
                let error = BindingError::UnresolvedPath {
                    block_id: selection.block_id.clone(),
                    field: selection.field.clone(),
                };
                warn!(%error, "Could not restore caret");
                Err(error)
            }
        }
    }

    /// Leave the field; an outstanding format request is abandoned
    pub fn cancel<D: DomView>(&mut self, dom: &mut D) {
        if let FocusState::Formatting { address, request_id } = &self.state {
            debug!(request_id, "Abandoning format request");
            let address = address.clone();
            set_editable(dom, &address, true);
        }
        self.state = FocusState::Unfocused;
        self.role = None;
        self.selection = None;
    }

    /// Drop focus if it belongs to a removed block.
    ///
    /// No DOM is touched: the block's markup is going away.
    pub fn clear_for_block(&mut self, block_id: &BlockId) -> bool {
        let owned = self.address().is_some_and(|a| &a.block_id == block_id);
        if owned {
            self.state = FocusState::Unfocused;
            self.role = None;
            self.selection = None;
        }
        owned
    }
}

fn set_editable<D: DomView>(dom: &mut D, address: &FieldAddress, editable: bool) {
    let elements: Vec<ElementRef> = BindingResolver::new(&*dom)
        .field_bindings(&address.block_id, &address.field)
        .into_iter()
        .map(|binding| binding.element)
        .collect();
    let value = if editable { "true" } else { "false" };
    for el in elements {
        dom.set_attribute(el, markers::CONTENT_EDITABLE, value);
    }
}

/// Express a DOM point as a node-id path plus offset.
///
/// Rich-text points outside any node-id element are corrected to the start
/// of the first addressable node and reported.
fn capture_point<D: DomView>(
    dom: &D,
    hit: &FieldHit,
    point: DomPoint,
) -> Result<(TextPoint, Option<BindingError>), BindingError> {
    let root = hit.binding.element;
    if hit.binding.role != FieldRole::RichText {
        return Ok((TextPoint::new(Vec::new(), dom.text_offset_within(root, point)), None));
    }

    let resolver = BindingResolver::new(dom);
    if let Some((_, el)) = resolver.nearest_node(root, point.node) {
        let offset = dom.text_offset_within(el, point);
        return Ok((TextPoint::new(resolver.node_path(root, el), offset), None));
    }

    let error = BindingError::MissingNodeId {
        block_id: hit.block_id.clone(),
        field: hit.field.clone(),
    };
    match nearest_boundary(dom, &resolver, root, point) {
        Some(corrected) => {
            warn!(%error, "Selection outside any node, moving caret to the nearest node boundary");
            Ok((corrected, Some(error)))
        }
        None => {
            warn!(%error, "Rich-text field has no addressable nodes");
            Err(error)
        }
    }
}

/// Caret for a point no node-id element covers: the end of the last innermost
/// node-id element starting at or before it, else the start of the first.
fn nearest_boundary<D: DomView>(
    dom: &D,
    resolver: &BindingResolver<'_, D>,
    root: ElementRef,
    point: DomPoint,
) -> Option<TextPoint> {
    let target = dom.text_offset_within(root, point);
    let innermost: Vec<ElementRef> = dom
        .descendants(root)
        .into_iter()
        .filter(|el| dom.has_attribute(*el, markers::NODE_ID))
        .filter(|el| !dom.descendants(*el).iter().any(|d| dom.has_attribute(*d, markers::NODE_ID)))
        .collect();

    let (el, start) = innermost
        .iter()
        .map(|el| (*el, dom.text_offset_within(root, DomPoint::new(*el, 0))))
        .take_while(|(_, start)| *start <= target)
        .last()
        .or_else(|| innermost.first().map(|el| (*el, 0)))?;

    let len = dom.text_content(el).chars().count();
    Some(TextPoint::new(resolver.node_path(root, el), target.saturating_sub(start).min(len)))
}
