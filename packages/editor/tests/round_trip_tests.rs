//! Control panel and preview wired together over in-memory transports.

use blockframe_editor::{ControlPanel, EditorConfig, Page, TemplateStore};
use blockframe_model::{Block, BlockId, BlockType, FieldValue, Mark, RichNode, RichText, SchemaRegistry};
use blockframe_preview::{
    BindingResolver, DomPoint, DomView, ElementRef, FieldAddress, FocusState, PreviewConfig, PreviewEffect, PreviewSession,
    VirtualDom,
};
use blockframe_protocol::{markers, MemoryTransport, StatePayload};
use std::time::{Duration, Instant};

fn render(dom: &mut VirtualDom, state: &StatePayload) {
    let root = dom.root();
    dom.clear_children(root);
    for block in state.ordered_blocks() {
        let el = dom.append_element(root, "div", &[(markers::BLOCK_ID, block.id.as_str())]);
        for (name, value) in &block.fields {
            match value {
                FieldValue::Text(text) => {
                    let field = dom.append_element(el, "h1", &[(markers::PLAIN_TEXT, name.as_str())]);
                    dom.append_text(field, text);
                }
                FieldValue::RichText(doc) => {
                    let field = dom.append_element(
                        el,
                        "div",
                        &[(markers::RICH_TEXT, name.as_str()), (markers::CONTENT_EDITABLE, "true")],
                    );
                    for node in &doc.nodes {
                        render_node(dom, field, node);
                    }
                }
                _ => {}
            }
        }
    }
}

fn render_node(dom: &mut VirtualDom, parent: ElementRef, node: &RichNode) {
    match node {
        RichNode::Container { id, tag, children } => {
            let el = dom.append_element(parent, tag, &[(markers::NODE_ID, id.as_str())]);
            for child in children {
                render_node(dom, el, child);
            }
        }
        RichNode::Leaf { id, text, marks } => {
            let tag = if marks.contains(&Mark::Bold) { "strong" } else { "span" };
            let el = dom.append_element(parent, tag, &[(markers::NODE_ID, id.as_str())]);
            dom.append_text(el, text);
        }
    }
}

fn field_text(dom: &VirtualDom, block: &str, field: &str) -> ElementRef {
    let root = BindingResolver::new(dom)
        .field_root(&BlockId::from(block), field)
        .unwrap()
        .element;
    dom.descendants(root).into_iter().find(|n| dom.is_text(*n)).unwrap()
}

struct Wiring {
    panel: ControlPanel<MemoryTransport>,
    preview: PreviewSession<MemoryTransport>,
    to_preview: MemoryTransport,
    to_panel: MemoryTransport,
    dom: VirtualDom,
}

impl Wiring {
    fn new() -> Self {
        let title = Block::new("b1", BlockType::Title).with_field("title", FieldValue::text("Welcome"));
        let body = Block::new("b2", BlockType::Slate).with_field(
            "value",
            FieldValue::RichText(RichText::new(vec![RichNode::container(
                "p1",
                "p",
                vec![RichNode::leaf("t1", "Hello world")],
            )])),
        );
        let page = Page::new("/front-page", vec![title, body]).unwrap();

        let to_preview = MemoryTransport::new();
        let to_panel = MemoryTransport::new();
        let (panel, _) = ControlPanel::open(
            EditorConfig::default(),
            page,
            SchemaRegistry::with_builtins(),
            TemplateStore::new(),
            to_preview.clone(),
        );
        let preview = PreviewSession::new(PreviewConfig::default(), to_panel.clone());

        let mut wiring = Self {
            panel,
            preview,
            to_preview,
            to_panel,
            dom: VirtualDom::new(),
        };
        wiring.panel.push_state();
        wiring.deliver_to_preview();
        wiring
    }

    /// Hand every queued panel message to the preview, re-rendering on request
    fn deliver_to_preview(&mut self) -> Vec<PreviewEffect> {
        let mut all = Vec::new();
        for envelope in self.to_preview.drain() {
            let effects = self.preview.handle_envelope(&mut self.dom, envelope);
            for effect in &effects {
                if let PreviewEffect::Render(state) = effect {
                    render(&mut self.dom, state);
                }
            }
            all.extend(effects);
        }
        all
    }

    fn deliver_to_panel(&mut self) -> usize {
        let envelopes = self.to_panel.drain();
        let count = envelopes.len();
        for envelope in envelopes {
            self.panel.handle_envelope(envelope).unwrap();
        }
        count
    }
}

#[test]
fn test_typed_text_reaches_the_panel_after_the_window() {
    let mut w = Wiring::new();
    let text = field_text(&w.dom, "b1", "title");
    w.preview.click(&mut w.dom, DomPoint::new(text, 0), None).unwrap();
    w.deliver_to_panel();
    assert_eq!(w.panel.page().selection(), Some(&BlockId::from("b1")));

    let t0 = Instant::now();
    w.preview.type_text("Hi ", t0).unwrap();
    assert_eq!(w.deliver_to_panel(), 0);

    w.preview.tick(t0 + Duration::from_millis(400));
    assert_eq!(w.deliver_to_panel(), 2);
    assert_eq!(
        w.panel.page().get(&BlockId::from("b1")).unwrap().field("title"),
        Some(&FieldValue::text("Hi Welcome"))
    );
    assert_eq!(w.panel.selection().unwrap().offset, 3);

    // the confirming push matches what the preview already shows
    w.deliver_to_preview();
    let state = w.preview.state().unwrap();
    assert_eq!(state.blocks[&BlockId::from("b1")].field("title"), Some(&FieldValue::text("Hi Welcome")));
}

#[test]
fn test_format_request_answered_by_panel() {
    let mut w = Wiring::new();
    let text = field_text(&w.dom, "b2", "value");
    w.preview
        .click(&mut w.dom, DomPoint::new(text, 0), Some(DomPoint::new(text, 5)))
        .unwrap();
    w.preview.format(&mut w.dom, Mark::Bold).unwrap();
    w.deliver_to_panel();

    let stored = w.panel.page().get(&BlockId::from("b2")).unwrap().field("value").unwrap();
    let document = stored.as_rich_text().unwrap();
    assert_eq!(document.plain_text(), "Hello world");
    assert!(document.validate().is_ok());

    w.deliver_to_preview();
    assert_eq!(w.preview.focus_state(), &FocusState::Editing(FieldAddress::new("b2", "value")));

    let state = w.preview.state().unwrap().clone();
    render(&mut w.dom, &state);
    let caret = w.preview.restore_caret(&w.dom).unwrap();
    let wrapper = w.dom.parent(caret.node).unwrap();
    assert_eq!(w.dom.tag(wrapper), Some("strong"));
}

#[test]
fn test_structural_request_removes_block_and_repushes() {
    let mut w = Wiring::new();
    w.preview.request_remove(BlockId::from("b2"));
    w.deliver_to_panel();

    assert_eq!(w.panel.page().order(), vec![BlockId::from("b1")]);
    let effects = w.deliver_to_preview();
    assert!(effects.iter().any(|e| matches!(e, PreviewEffect::Render(_))));
    assert_eq!(w.preview.state().unwrap().block_order, vec![BlockId::from("b1")]);

    w.preview.request_undo();
    w.deliver_to_panel();
    w.deliver_to_preview();
    assert_eq!(
        w.preview.state().unwrap().block_order,
        vec![BlockId::from("b1"), BlockId::from("b2")]
    );
}

#[test]
fn test_refused_request_still_resyncs_preview() {
    let mut w = Wiring::new();
    w.preview.request_remove(BlockId::from("missing"));
    for envelope in w.to_panel.drain() {
        assert!(w.panel.handle_envelope(envelope).is_err());
    }

    assert_eq!(w.to_preview.len(), 1);
    w.deliver_to_preview();
    assert_eq!(w.preview.state().unwrap().block_order.len(), 2);
}
