//! # Control Panel Session
//!
//! Owns the canonical page and answers the preview's messages. The preview
//! never mutates the page itself: it asks, and the control panel applies
//! the change through the structural engine and pushes the full state back.
//! A request the page does not allow is refused and the current state is
//! pushed again so the preview drops any optimistic rendering.

use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult, StructuralViolation};
use crate::format::apply_format;
use crate::page::Page;
use crate::structural::{InsertionPoint, StructuralEngine};
use crate::template::{apply_templates, insert_template, MergeReport, TemplateStore};
use blockframe_model::{BlockId, BlockType, FieldValue, InsertPosition, SchemaRegistry, Selection};
use blockframe_protocol::{
    Endpoint, Envelope, FieldUpdate, FormatRequest, FormatResponse, Message, SelectionReport, StructuralOp, Transport,
};
use tracing::{debug, info, warn};

pub struct ControlPanel<T: Transport> {
    page: Page,
    engine: StructuralEngine,
    templates: TemplateStore,
    endpoint: Endpoint<T>,
    /// Last caret the preview reported
    selection: Option<Selection>,
}

impl<T: Transport> ControlPanel<T> {
    /// Open a page: merge every template it refers to, then start with
    /// empty history
    pub fn open(
        config: EditorConfig,
        mut page: Page,
        schema: SchemaRegistry,
        templates: TemplateStore,
        transport: T,
    ) -> (Self, Vec<MergeReport>) {
        let reports = apply_templates(&mut page, &templates);
        info!(path = %page.path(), blocks = page.len(), templates = reports.len(), "Opened page");

        let panel = Self {
            page,
            engine: StructuralEngine::with_undo_levels(schema, config.undo_levels),
            templates,
            endpoint: Endpoint::new(config.origin, config.preview_origin, transport),
            selection: None,
        };
        (panel, reports)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn engine(&self) -> &StructuralEngine {
        &self.engine
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// Caret last reported by the preview
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn transport(&self) -> &T {
        self.endpoint.transport()
    }

    pub fn insertion_points(&self) -> Vec<InsertionPoint> {
        self.engine.insertion_points(&self.page)
    }

    /// Send the full page state to the preview
    pub fn push_state(&mut self) -> u64 {
        let payload = self.page.state_payload(self.engine.schema());
        self.endpoint.send(Message::InitialState(payload))
    }

    pub fn handle_json(&mut self, raw: &str) -> EditorResult<bool> {
        match Envelope::from_json(raw) {
            Ok(envelope) => self.handle_envelope(envelope),
            Err(error) => {
                warn!(%error, "Dropping malformed message");
                Ok(false)
            }
        }
    }

    /// Apply one message from the preview.
    ///
    /// Returns whether the page changed. Refused requests come back as the
    /// error after the current state has been re-pushed.
    pub fn handle_envelope(&mut self, envelope: Envelope) -> EditorResult<bool> {
        let Some(message) = self.endpoint.receive(envelope) else {
            return Ok(false);
        };

        match message {
            Message::FieldUpdate(update) => self.apply_field_update(update),
            Message::FormatRequest(request) => self.apply_format_request(request),
            Message::StructuralCommand(op) => self.apply_structural(op),
            Message::SelectionReport(report) => {
                self.apply_selection_report(report);
                Ok(false)
            }
            Message::InitialState(_) | Message::FormatResponse(_) => {
                debug!(kind = message.kind(), "Ignoring control-panel message from preview");
                Ok(false)
            }
        }
    }

    fn apply_field_update(&mut self, update: FieldUpdate) -> EditorResult<bool> {
        let result = self
            .engine
            .update_field(&mut self.page, &update.block_id, &update.field, update.value);
        self.settle(result)
    }

    fn apply_format_request(&mut self, request: FormatRequest) -> EditorResult<bool> {
        match self.format(&request) {
            Ok(response) => {
                self.endpoint.send(Message::FormatResponse(response));
                Ok(true)
            }
            Err(error) => {
                warn!(%error, block_id = %request.block_id, field = %request.field, "Refusing format request");
                if let Some(echo) = self.unchanged_format_response(&request) {
                    self.endpoint.send(Message::FormatResponse(echo));
                }
                Err(error)
            }
        }
    }

    fn format(&mut self, request: &FormatRequest) -> EditorResult<FormatResponse> {
        let document = match &request.document {
            Some(document) => document.clone(),
            None => self
                .page
                .get(&request.block_id)
                .ok_or_else(|| StructuralViolation::UnknownBlock(request.block_id.clone()))?
                .field(&request.field)
                .and_then(FieldValue::as_rich_text)
                .cloned()
                .ok_or_else(|| EditorError::NotRichText {
                    block_id: request.block_id.clone(),
                    field: request.field.clone(),
                })?,
        };

        let response = apply_format(document, request)?;
        self.engine.update_field(
            &mut self.page,
            &request.block_id,
            &request.field,
            FieldValue::RichText(response.document.clone()),
        )?;
        Ok(response)
    }

    /// Response handing the preview its own document back, so it leaves
    /// the formatting state
    fn unchanged_format_response(&self, request: &FormatRequest) -> Option<FormatResponse> {
        let document = request.document.clone().or_else(|| {
            self.page
                .get(&request.block_id)?
                .field(&request.field)?
                .as_rich_text()
                .cloned()
        })?;
        Some(FormatResponse {
            request_id: request.request_id,
            block_id: request.block_id.clone(),
            field: request.field.clone(),
            document,
            selection: request.selection.clone(),
        })
    }

    fn apply_structural(&mut self, op: StructuralOp) -> EditorResult<bool> {
        debug!(?op, "Structural command");
        let result = match op {
            StructuralOp::Add {
                reference_id,
                position,
                block_type,
            } => self
                .engine
                .add_block(&mut self.page, &reference_id, position, block_type)
                .map(|_| true),
            StructuralOp::Remove { block_id } => self.remove_and_forget(&block_id).map(|_| true),
            StructuralOp::Move {
                block_id,
                target_id,
                position,
                whole_instance,
            } => self
                .engine
                .move_block(&mut self.page, &block_id, &target_id, position, whole_instance)
                .map(|_| true),
            StructuralOp::Select { block_id } => self.page.select(block_id).map(|_| true).map_err(Into::into),
            StructuralOp::Undo => self.engine.undo(&mut self.page),
            StructuralOp::Redo => self.engine.redo(&mut self.page),
        };
        self.settle(result)
    }

    fn remove_and_forget(&mut self, block_id: &BlockId) -> EditorResult<()> {
        self.engine.remove_block(&mut self.page, block_id)?;
        if self
            .selection
            .as_ref()
            .is_some_and(|selection| !self.page.contains(&selection.block_id))
        {
            self.selection = None;
        }
        Ok(())
    }

    fn apply_selection_report(&mut self, report: SelectionReport) {
        if !self.page.contains(&report.block_id) {
            debug!(block_id = %report.block_id, "Selection report for unknown block");
            return;
        }
        self.page.set_selection(Some(report.block_id));
        self.selection = report.selection;
    }

    /// Push state after a change, or after a refusal so the preview reverts
    fn settle(&mut self, result: EditorResult<bool>) -> EditorResult<bool> {
        match result {
            Ok(true) => {
                self.push_state();
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(error) => {
                warn!(%error, "Refusing edit");
                self.push_state();
                Err(error)
            }
        }
    }

    pub fn add_block(
        &mut self,
        reference_id: &BlockId,
        position: InsertPosition,
        block_type: BlockType,
    ) -> EditorResult<BlockId> {
        let id = self.engine.add_block(&mut self.page, reference_id, position, block_type)?;
        self.push_state();
        Ok(id)
    }

    pub fn remove_block(&mut self, block_id: &BlockId) -> EditorResult<()> {
        self.remove_and_forget(block_id)?;
        self.push_state();
        Ok(())
    }

    pub fn move_block(
        &mut self,
        block_id: &BlockId,
        target_id: &BlockId,
        position: InsertPosition,
        whole_instance: bool,
    ) -> EditorResult<()> {
        self.engine
            .move_block(&mut self.page, block_id, target_id, position, whole_instance)?;
        self.push_state();
        Ok(())
    }

    pub fn update_field(&mut self, block_id: &BlockId, field: &str, value: FieldValue) -> EditorResult<bool> {
        let changed = self.engine.update_field(&mut self.page, block_id, field, value)?;
        if changed {
            self.push_state();
        }
        Ok(changed)
    }

    pub fn select(&mut self, block_id: Option<BlockId>) -> EditorResult<()> {
        self.page.select(block_id)?;
        self.push_state();
        Ok(())
    }

    pub fn undo(&mut self) -> EditorResult<bool> {
        let undone = self.engine.undo(&mut self.page)?;
        if undone {
            self.push_state();
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        let redone = self.engine.redo(&mut self.page)?;
        if redone {
            self.push_state();
        }
        Ok(redone)
    }

    /// Apply a named template relative to a block, or at the top of an
    /// empty page. One undo step.
    ///
    /// A template that already has an instance on the page is merged in
    /// place instead, and `at` is not used.
    pub fn insert_template(
        &mut self,
        name: &str,
        at: Option<(&BlockId, InsertPosition)>,
    ) -> EditorResult<MergeReport> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| EditorError::UnknownTemplate(name.to_string()))?;
        let present = self.page.blocks().iter().any(|b| b.template_name() == Some(name));
        let index = match at {
            Some((reference, _)) if present => {
                debug!(template = %name, reference = %reference, "Template already on page, merging in place");
                0
            }
            Some((reference, position)) => self.engine.insertion_gap(&self.page, reference, position)?,
            None => 0,
        };

        let mut draft = self.page.clone();
        let report = insert_template(&mut draft, template, index)?;
        self.engine
            .replace_blocks(&mut self.page, draft.blocks().to_vec(), "Insert template")?;

        info!(template = %name, inserted = report.inserted.len(), "Inserted template");
        self.push_state();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Template, TemplateNode};
    use blockframe_model::Block;
    use blockframe_protocol::{MemoryTransport, Outbox};

    fn panel(ids: &[&str]) -> (ControlPanel<MemoryTransport>, MemoryTransport) {
        let wire = MemoryTransport::new();
        let page = Page::new("/p", ids.iter().map(|id| Block::new(*id, BlockType::Text)).collect()).unwrap();
        let (panel, _) = ControlPanel::open(
            EditorConfig::default(),
            page,
            SchemaRegistry::with_builtins(),
            TemplateStore::new(),
            wire.clone(),
        );
        (panel, wire)
    }

    #[test]
    fn test_field_update_pushes_state() {
        let (mut panel, wire) = panel(&["a"]);
        let mut preview = Outbox::new("preview");

        let changed = panel
            .handle_envelope(preview.seal(Message::FieldUpdate(FieldUpdate {
                block_id: BlockId::from("a"),
                field: "text".to_string(),
                value: FieldValue::text("hi"),
            })))
            .unwrap();

        assert!(changed);
        let sent = wire.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.kind(), "INITIAL_STATE");
    }

    #[test]
    fn test_foreign_origin_ignored() {
        let (mut panel, wire) = panel(&["a"]);
        let mut intruder = Outbox::new("elsewhere");

        let changed = panel
            .handle_envelope(intruder.seal(Message::StructuralCommand(StructuralOp::Remove {
                block_id: BlockId::from("a"),
            })))
            .unwrap();

        assert!(!changed);
        assert_eq!(panel.page().len(), 1);
        assert!(wire.is_empty());
    }

    #[test]
    fn test_refused_command_repushes_state() {
        let (mut panel, wire) = panel(&["a"]);
        let mut preview = Outbox::new("preview");

        let result = panel.handle_envelope(preview.seal(Message::StructuralCommand(StructuralOp::Remove {
            block_id: BlockId::from("missing"),
        })));

        assert!(matches!(result, Err(EditorError::Structural(StructuralViolation::UnknownBlock(_)))));
        assert_eq!(wire.drain().len(), 1);
    }

    #[test]
    fn test_undo_over_the_wire() {
        let (mut panel, _wire) = panel(&["a", "b"]);
        let mut preview = Outbox::new("preview");

        panel
            .handle_envelope(preview.seal(Message::StructuralCommand(StructuralOp::Remove {
                block_id: BlockId::from("b"),
            })))
            .unwrap();
        assert_eq!(panel.page().len(), 1);

        let undone = panel
            .handle_envelope(preview.seal(Message::StructuralCommand(StructuralOp::Undo)))
            .unwrap();
        assert!(undone);
        assert_eq!(panel.page().order(), vec![BlockId::from("a"), BlockId::from("b")]);
    }

    #[test]
    fn test_insert_template_already_on_page_merges_in_place() {
        let wire = MemoryTransport::new();
        let page = Page::new("/p", vec![Block::new("a", BlockType::Text), Block::new("b", BlockType::Text)]).unwrap();
        let mut templates = TemplateStore::new();
        templates.insert(Template::new(
            "Banner",
            vec![TemplateNode::Block {
                block: Block::new("tpl", BlockType::Title).with_field("title", FieldValue::text("Sale")),
                children: Vec::new(),
            }],
        ));
        let (mut panel, _) = ControlPanel::open(
            EditorConfig::default(),
            page,
            SchemaRegistry::with_builtins(),
            templates,
            wire.clone(),
        );

        let first = panel
            .insert_template("Banner", Some((&BlockId::from("a"), InsertPosition::After)))
            .unwrap();
        assert_eq!(first.inserted.len(), 1);
        let banner = first.inserted[0].clone();
        assert_eq!(panel.page().order(), vec![BlockId::from("a"), banner.clone(), BlockId::from("b")]);

        // the requested position (even an unknown reference) is not used
        let again = panel
            .insert_template("Banner", Some((&BlockId::from("missing"), InsertPosition::Before)))
            .unwrap();
        assert!(again.applied);
        assert!(again.inserted.is_empty());
        assert_eq!(panel.page().order(), vec![BlockId::from("a"), banner, BlockId::from("b")]);
    }
}
