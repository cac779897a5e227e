//! # Preview session
//!
//! Explicit state object for one embedded preview: the last authoritative
//! state, the focus state machine, the debouncer and the channel endpoint.
//! Nothing here is global, so several previews can run side by side.
//!
//! The host feeds in envelopes and user gestures, performs the returned
//! [`PreviewEffect`]s (rendering is the foreign renderer's job) and calls
//! [`PreviewSession::tick`] when the debouncer's deadline passes.

use crate::binding::BindingResolver;
use crate::config::PreviewConfig;
use crate::debounce::{decide, ApplyDecision, EditDebouncer};
use crate::dom::{DomPoint, DomView};
use crate::drop_target::{compute_drop_target, DropIndicator};
use crate::error::{BindingError, PreviewError};
use crate::geometry::{Rect, ResizeWatch};
use crate::selection::{FieldAddress, FocusState, SelectionSync};
use blockframe_model::{Block, BlockId, BlockType, FieldValue, InsertPosition, Mark, Selection, TextPoint};
use blockframe_protocol::{
    Endpoint, Envelope, FieldUpdate, FormatRequest, FormatResponse, Message, SelectionReport, StatePayload,
    StructuralOp, Transport,
};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Work the host performs after feeding the session
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEffect {
    /// Re-render the whole page from this state
    Render(StatePayload),
    /// Re-render one field
    RenderField { address: FieldAddress, value: FieldValue },
    /// Put the caret back once rendering finished ([`PreviewSession::restore_caret`])
    RestoreSelection(Selection),
    /// Developer-visible marker problem
    Warning(BindingError),
    /// Control panel changed the selected block
    SelectBlock(Option<BlockId>),
}

pub struct PreviewSession<T: Transport> {
    config: PreviewConfig,
    endpoint: Endpoint<T>,
    state: Option<StatePayload>,
    sync: SelectionSync,
    debouncer: EditDebouncer,
    /// Selection report waiting for the edit it describes to flush
    held_report: Option<Selection>,
    resize: ResizeWatch,
}

impl<T: Transport> PreviewSession<T> {
    pub fn new(config: PreviewConfig, transport: T) -> Self {
        let endpoint = Endpoint::new(config.origin.clone(), config.control_panel_origin.clone(), transport);
        let debouncer = EditDebouncer::new(config.coalescing_window());
        Self {
            config,
            endpoint,
            state: None,
            sync: SelectionSync::new(),
            debouncer,
            held_report: None,
            resize: ResizeWatch::new(),
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn state(&self) -> Option<&StatePayload> {
        self.state.as_ref()
    }

    pub fn focus_state(&self) -> &FocusState {
        self.sync.state()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.sync.selection()
    }

    pub fn transport(&self) -> &T {
        self.endpoint.transport()
    }

    pub fn has_pending_edits(&self) -> bool {
        self.debouncer.has_pending()
    }

    /// When the host should call [`tick`](Self::tick) next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.next_deadline()
    }

    /// Current value of a field as the user sees it, unflushed keystrokes included
    pub fn value_of(&self, address: &FieldAddress) -> Option<FieldValue> {
        if let Some(value) = self.debouncer.pending_value(address) {
            return Some(value.clone());
        }
        self.state
            .as_ref()
            .and_then(|state| find_block(state, &address.block_id))
            .and_then(|block| block.field(&address.field))
            .cloned()
    }

    pub fn handle_envelope<D: DomView>(&mut self, dom: &mut D, envelope: Envelope) -> Vec<PreviewEffect> {
        match self.endpoint.receive(envelope) {
            Some(message) => self.dispatch(dom, message),
            None => Vec::new(),
        }
    }

    pub fn handle_json<D: DomView>(&mut self, dom: &mut D, raw: &str) -> Vec<PreviewEffect> {
        match self.endpoint.receive_json(raw) {
            Some(message) => self.dispatch(dom, message),
            None => Vec::new(),
        }
    }

    fn dispatch<D: DomView>(&mut self, dom: &mut D, message: Message) -> Vec<PreviewEffect> {
        match message {
            Message::InitialState(state) => self.apply_state(state),
            Message::FieldUpdate(update) => self.apply_field_update(update),
            Message::FormatResponse(response) => self.apply_format_response(dom, response),
            Message::StructuralCommand(StructuralOp::Select { block_id }) => vec![PreviewEffect::SelectBlock(block_id)],
            other => {
                debug!(kind = other.kind(), "Ignoring message not addressed to the preview");
                Vec::new()
            }
        }
    }

    /// Full-state push: authoritative for structure, but unflushed local
    /// keystrokes stay on screen
    fn apply_state(&mut self, state: StatePayload) -> Vec<PreviewEffect> {
        if self.state.as_ref() == Some(&state) {
            debug!("Identical state push, nothing to apply");
            return Vec::new();
        }

        let removed: Vec<BlockId> = self
            .state
            .iter()
            .flat_map(|previous| previous.blocks.keys())
            .filter(|id| find_block(&state, id).is_none())
            .cloned()
            .collect();
        for id in &removed {
            self.forget_block(id);
        }

        let previously_selected = self.state.as_ref().and_then(|s| s.selected_block.clone());
        let selection_changed = previously_selected != state.selected_block;

        let mut rendered = state.clone();
        for (address, value) in self.pending_values() {
            if let Some(block) = find_block_mut(&mut rendered, &address.block_id) {
                if block.fields.contains_key(&address.field) {
                    debug!(field = %address, "Keeping local value over pushed state");
                    block.fields.insert(address.field, value);
                }
            }
        }

        let selected = state.selected_block.clone();
        self.state = Some(state);

        let mut effects = vec![PreviewEffect::Render(rendered)];
        if selection_changed {
            effects.push(PreviewEffect::SelectBlock(selected));
        }
        if let Some(selection) = self.reresolve_selection() {
            effects.push(PreviewEffect::RestoreSelection(selection));
        }
        effects
    }

    fn apply_field_update(&mut self, update: FieldUpdate) -> Vec<PreviewEffect> {
        let address = FieldAddress::new(update.block_id, update.field);

        match decide(self.sync.editing(), &self.debouncer, &address) {
            ApplyDecision::Suppress => {
                debug!(field = %address, "Suppressing update over in-flight keystrokes");
                Vec::new()
            }
            ApplyDecision::Apply | ApplyDecision::ReplaceAndReresolve => {
                self.store(&address, update.value.clone());
                let mut effects = vec![PreviewEffect::RenderField {
                    address: address.clone(),
                    value: update.value,
                }];
                if self.sync.address() == Some(&address) {
                    if let Some(selection) = self.reresolve_selection() {
                        effects.push(PreviewEffect::RestoreSelection(selection));
                    }
                }
                effects
            }
        }
    }

    fn apply_format_response<D: DomView>(&mut self, dom: &mut D, response: FormatResponse) -> Vec<PreviewEffect> {
        let Some(selection) = self.sync.complete_format(dom, &response) else {
            return Vec::new();
        };

        let address = FieldAddress::new(response.block_id, response.field);
        let value = FieldValue::RichText(response.document);
        self.store(&address, value.clone());
        self.report(selection.clone());

        vec![
            PreviewEffect::RenderField { address, value },
            PreviewEffect::RestoreSelection(selection),
        ]
    }

    /// Focus the field under a click
    pub fn click<D: DomView>(
        &mut self,
        dom: &mut D,
        anchor: DomPoint,
        extent: Option<DomPoint>,
    ) -> Result<Vec<PreviewEffect>, PreviewError> {
        let previous = self.sync.address().cloned();
        let focus = self.sync.focus(dom, anchor, extent)?;
        let address = FieldAddress::new(focus.selection.block_id.clone(), focus.selection.field.clone());

        if let Some(previous) = previous.filter(|p| *p != address) {
            if let Some(update) = self.debouncer.flush(&previous) {
                self.send_update(update);
            }
        }

        self.held_report = None;
        self.report(focus.selection);

        Ok(focus.warning.into_iter().map(PreviewEffect::Warning).collect())
    }

    /// Caret moved inside the focused field without text changes
    pub fn move_caret<D: DomView>(
        &mut self,
        dom: &D,
        anchor: DomPoint,
        extent: Option<DomPoint>,
    ) -> Result<Selection, PreviewError> {
        let selection = self.sync.caret_moved(dom, anchor, extent)?;
        self.report(selection.clone());
        Ok(selection)
    }

    /// Apply typed text locally; a range is collapsed to its extent first.
    ///
    /// Nothing is sent until the coalescing window passes.
    pub fn type_text(&mut self, inserted: &str, now: Instant) -> Result<Selection, PreviewError> {
        let (address, selection, mut value) = self.editable_value()?;

        let caret = match &mut value {
            FieldValue::Text(text) => {
                let offset = selection.extent_offset.min(text.chars().count());
                text.insert_str(byte_index(text, offset), inserted);
                TextPoint::new(Vec::new(), offset + inserted.chars().count())
            }
            FieldValue::RichText(doc) => doc.insert_text(&selection.extent(), inserted)?,
            _ => return Err(PreviewError::NotTextual(address.to_string())),
        };

        Ok(self.record_edit(address, value, caret, now))
    }

    pub fn delete_backward(&mut self, count: usize, now: Instant) -> Result<Selection, PreviewError> {
        let (address, selection, mut value) = self.editable_value()?;

        let caret = match &mut value {
            FieldValue::Text(text) => {
                let end = selection.extent_offset.min(text.chars().count());
                let start = end.saturating_sub(count);
                let range = byte_index(text, start)..byte_index(text, end);
                text.replace_range(range, "");
                TextPoint::new(Vec::new(), start)
            }
            FieldValue::RichText(doc) => doc.delete_backward(&selection.extent(), count)?,
            _ => return Err(PreviewError::NotTextual(address.to_string())),
        };

        Ok(self.record_edit(address, value, caret, now))
    }

    fn editable_value(&self) -> Result<(FieldAddress, Selection, FieldValue), PreviewError> {
        if self.sync.is_formatting() {
            return Err(BindingError::NotEditable.into());
        }
        let address = self.sync.address().cloned().ok_or(PreviewError::NotFocused)?;
        let selection = self.sync.selection().cloned().ok_or(PreviewError::NotFocused)?;
        let value = self
            .value_of(&address)
            .ok_or_else(|| PreviewError::NotTextual(address.to_string()))?;
        Ok((address, selection, value))
    }

    fn record_edit(&mut self, address: FieldAddress, value: FieldValue, caret: TextPoint, now: Instant) -> Selection {
        self.sync.begin_editing();
        let selection = Selection::collapsed(address.block_id.clone(), address.field.clone(), caret);
        self.sync.set_selection(selection.clone());
        self.debouncer.record(address, value, now);
        self.held_report = Some(selection.clone());
        selection
    }

    /// Flush fields whose window elapsed, then any selection report that
    /// was waiting on them. Returns the number of messages sent.
    pub fn tick(&mut self, now: Instant) -> usize {
        let updates = self.debouncer.flush_due(now);
        let mut sent = updates.len();
        for update in updates {
            self.send_update(update);
        }

        if let Some(selection) = self.held_report.take() {
            let address = FieldAddress::new(selection.block_id.clone(), selection.field.clone());
            if self.debouncer.is_pending(&address) {
                self.held_report = Some(selection);
            } else {
                self.send_report(selection);
                sent += 1;
            }
        }
        sent
    }

    /// Toggle a mark over the current selection through the control panel
    pub fn format<D: DomView>(&mut self, dom: &mut D, mark: Mark) -> Result<u64, PreviewError> {
        let address = self.sync.address().cloned().ok_or(PreviewError::NotFocused)?;
        let document = match self.value_of(&address) {
            Some(FieldValue::RichText(doc)) => doc,
            _ => return Err(PreviewError::NotRichText(address.to_string())),
        };

        let (request_id, selection) = self.sync.begin_format(dom)?;

        // the request carries the local document, so pending keystrokes ride along
        self.debouncer.cancel(&address);
        self.held_report = None;
        self.store(&address, FieldValue::RichText(document.clone()));

        self.endpoint.send(Message::FormatRequest(FormatRequest {
            request_id,
            block_id: address.block_id,
            field: address.field,
            mark,
            selection,
            document: Some(document),
        }));
        Ok(request_id)
    }

    /// Map the tracked caret onto the freshly rendered markup
    pub fn restore_caret<D: DomView>(&self, dom: &D) -> Result<DomPoint, BindingError> {
        self.sync.restore(dom)
    }

    /// Select a whole block: leaves the focused field
    pub fn select_block<D: DomView>(&mut self, dom: &mut D, block_id: BlockId) -> u64 {
        for update in self.debouncer.flush_all() {
            self.send_update(update);
        }
        self.sync.cancel(dom);
        self.held_report = None;
        self.endpoint.send(Message::SelectionReport(SelectionReport {
            block_id,
            selection: None,
        }))
    }

    pub fn request_add(&mut self, reference_id: BlockId, position: InsertPosition, block_type: BlockType) -> u64 {
        self.endpoint.send(Message::StructuralCommand(StructuralOp::Add {
            reference_id,
            position,
            block_type,
        }))
    }

    /// Ask for a block's removal; its pending edits and format round trip
    /// are cancelled right away
    pub fn request_remove(&mut self, block_id: BlockId) -> u64 {
        self.forget_block(&block_id);
        self.endpoint.send(Message::StructuralCommand(StructuralOp::Remove { block_id }))
    }

    pub fn request_move(
        &mut self,
        block_id: BlockId,
        target_id: BlockId,
        position: InsertPosition,
        whole_instance: bool,
    ) -> u64 {
        self.endpoint.send(Message::StructuralCommand(StructuralOp::Move {
            block_id,
            target_id,
            position,
            whole_instance,
        }))
    }

    pub fn request_undo(&mut self) -> u64 {
        self.endpoint.send(Message::StructuralCommand(StructuralOp::Undo))
    }

    pub fn request_redo(&mut self) -> u64 {
        self.endpoint.send(Message::StructuralCommand(StructuralOp::Redo))
    }

    /// Drop indicator for the pointer position while dragging `dragged`
    pub fn drag_over<D: DomView>(&self, dom: &D, dragged: &BlockId, pointer_y: f64) -> Option<DropIndicator> {
        let state = self.state.as_ref()?;
        let locked: HashSet<BlockId> = state
            .ordered_blocks()
            .filter(|block| block.locked)
            .map(|block| block.id.clone())
            .collect();
        compute_drop_target(dom, &state.block_order, &locked, dragged, pointer_y)
    }

    /// Finish a drag; sends a move when the pointer is over a valid gap
    pub fn drop_block<D: DomView>(&mut self, dom: &D, dragged: BlockId, pointer_y: f64, whole_instance: bool) -> Option<u64> {
        let indicator = self.drag_over(dom, &dragged, pointer_y)?;
        Some(self.request_move(dragged, indicator.target, indicator.position, whole_instance))
    }

    /// Watch every rendered element of every block for size changes
    pub fn observe_resizes<D: DomView>(&mut self, dom: &D) {
        let Some(state) = self.state.as_ref() else { return };
        for id in &state.block_order {
            self.resize.observe(dom, id);
        }
    }

    pub fn poll_resizes<D: DomView>(&mut self, dom: &D) -> Vec<(BlockId, Rect)> {
        self.resize.poll(dom)
    }

    /// Check rendered rich-text fields for text without node-id markers
    pub fn audit<D: DomView>(&self, dom: &D) -> Vec<BindingError> {
        let Some(state) = self.state.as_ref() else {
            return Vec::new();
        };
        let resolver = BindingResolver::new(dom);
        let mut errors = Vec::new();
        for block in state.ordered_blocks() {
            for (name, value) in &block.fields {
                if matches!(value, FieldValue::RichText(_)) {
                    errors.extend(resolver.audit_rich_text(&block.id, name));
                }
            }
        }
        for error in &errors {
            warn!(%error, "Markup integrity problem");
        }
        errors
    }

    fn forget_block(&mut self, block_id: &BlockId) {
        self.debouncer.cancel_block(block_id);
        if self.sync.clear_for_block(block_id) {
            self.held_report = None;
        }
        self.resize.unobserve(block_id);
    }

    fn pending_values(&self) -> Vec<(FieldAddress, FieldValue)> {
        self.debouncer
            .pending()
            .map(|(address, value)| (address.clone(), value.clone()))
            .collect()
    }

    fn reresolve_selection(&mut self) -> Option<Selection> {
        let selection = self.sync.selection()?;
        let address = FieldAddress::new(selection.block_id.clone(), selection.field.clone());
        let value = self.value_of(&address)?;
        let text_len = value.as_text().map(|t| t.chars().count()).unwrap_or(0);
        self.sync.reresolve(value.as_rich_text(), text_len)
    }

    fn store(&mut self, address: &FieldAddress, value: FieldValue) {
        if let Some(block) = self
            .state
            .as_mut()
            .and_then(|state| find_block_mut(state, &address.block_id))
        {
            block.fields.insert(address.field.clone(), value);
        }
    }

    fn send_update(&mut self, update: FieldUpdate) {
        let address = FieldAddress::new(update.block_id.clone(), update.field.clone());
        self.store(&address, update.value.clone());
        self.endpoint.send(Message::FieldUpdate(update));
    }

    /// Send now, or hold until the field's pending edit has gone out
    fn report(&mut self, selection: Selection) {
        let address = FieldAddress::new(selection.block_id.clone(), selection.field.clone());
        if self.debouncer.is_pending(&address) {
            self.held_report = Some(selection);
        } else {
            self.send_report(selection);
        }
    }

    fn send_report(&mut self, selection: Selection) {
        self.endpoint.send(Message::SelectionReport(SelectionReport {
            block_id: selection.block_id.clone(),
            selection: Some(selection),
        }));
    }
}

fn find_block<'a>(state: &'a StatePayload, id: &BlockId) -> Option<&'a Block> {
    state.blocks.values().find_map(|block| block.find(id))
}

fn find_block_mut<'a>(state: &'a mut StatePayload, id: &BlockId) -> Option<&'a mut Block> {
    state.blocks.values_mut().find_map(|block| block.find_mut(id))
}

fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices().nth(char_offset).map(|(i, _)| i).unwrap_or(s.len())
}
