use blockframe_editor::{audit_page, insert_template, ControlPanel, EditorConfig, EditorError, Page, Template, TemplateStore};
use blockframe_model::SchemaRegistry;
use blockframe_protocol::{Envelope, MemoryTransport};
use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(context: &str, error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, error))
}

fn load_store(templates_json: &str) -> Result<TemplateStore, EditorError> {
    let templates: Vec<Template> = serde_json::from_str(templates_json)?;
    let mut store = TemplateStore::new();
    for template in templates {
        store.insert(template);
    }
    Ok(store)
}

/// Outcome of handing the control panel one message
#[wasm_bindgen]
pub struct HandleResult {
    changed: bool,
    error: Option<String>,
    outgoing: String,
}

#[wasm_bindgen]
impl HandleResult {
    /// Whether the page changed
    #[wasm_bindgen(getter)]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Why the request was refused, if it was
    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }

    /// JSON array of envelopes to post to the preview
    #[wasm_bindgen(getter)]
    pub fn outgoing(&self) -> String {
        self.outgoing.clone()
    }
}

/// Control panel owned by a JavaScript host.
///
/// The host posts `outgoing` envelopes to the preview frame and feeds every
/// message it receives back through `handleMessage`.
#[wasm_bindgen]
pub struct ControlPanelHandle {
    panel: ControlPanel<MemoryTransport>,
    outbox: MemoryTransport,
}

#[wasm_bindgen]
impl ControlPanelHandle {
    /// `templates_json` is an array of templates; `config_json` may be empty
    #[wasm_bindgen(constructor)]
    pub fn new(page_json: &str, templates_json: &str, config_json: &str) -> Result<ControlPanelHandle, JsValue> {
        let page = Page::from_json(page_json).map_err(|e| js_error("Page error", e))?;
        let templates = load_store(templates_json).map_err(|e| js_error("Template error", e))?;
        let config = if config_json.trim().is_empty() {
            EditorConfig::default()
        } else {
            serde_json::from_str(config_json).map_err(|e| js_error("Config error", e))?
        };

        let outbox = MemoryTransport::new();
        let (panel, _) = ControlPanel::open(
            config,
            page,
            SchemaRegistry::with_builtins(),
            templates,
            outbox.clone(),
        );
        Ok(Self { panel, outbox })
    }

    /// Full state push for a freshly loaded preview
    #[wasm_bindgen(js_name = pushState)]
    pub fn push_state(&mut self) -> Result<String, JsValue> {
        self.panel.push_state();
        self.drain().map_err(|e| js_error("Serialization error", e))
    }

    /// Handle one raw envelope from the preview
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&mut self, raw: &str) -> Result<HandleResult, JsValue> {
        let outcome = self.panel.handle_json(raw);
        self.result(outcome)
    }

    pub fn undo(&mut self) -> Result<HandleResult, JsValue> {
        let outcome = self.panel.undo();
        self.result(outcome)
    }

    pub fn redo(&mut self) -> Result<HandleResult, JsValue> {
        let outcome = self.panel.redo();
        self.result(outcome)
    }

    /// Current page document as JSON
    #[wasm_bindgen(js_name = pageJson)]
    pub fn page_json(&self) -> Result<String, JsValue> {
        self.panel.page().to_json().map_err(|e| js_error("Serialization error", e))
    }

    /// Allowed insertion gaps as JSON
    #[wasm_bindgen(js_name = insertionPoints)]
    pub fn insertion_points(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.panel.insertion_points()).map_err(|e| js_error("Serialization error", e))
    }
}

impl ControlPanelHandle {
    fn drain(&self) -> Result<String, serde_json::Error> {
        let envelopes: Vec<Envelope> = self.outbox.drain();
        serde_json::to_string(&envelopes)
    }

    fn result(&self, outcome: Result<bool, EditorError>) -> Result<HandleResult, JsValue> {
        let outgoing = self.drain().map_err(|e| js_error("Serialization error", e))?;
        Ok(match outcome {
            Ok(changed) => HandleResult {
                changed,
                error: None,
                outgoing,
            },
            Err(error) => HandleResult {
                changed: false,
                error: Some(error.to_string()),
                outgoing,
            },
        })
    }
}

/// Merge (or append) a template into a page and return the page JSON
#[wasm_bindgen(js_name = mergeTemplate)]
pub fn merge_template_js(page_json: &str, template_json: &str) -> Result<String, JsValue> {
    let mut page = Page::from_json(page_json).map_err(|e| js_error("Page error", e))?;
    let template = Template::from_json(template_json).map_err(|e| js_error("Template error", e))?;

    let end = page.len();
    insert_template(&mut page, &template, end).map_err(|e| js_error("Merge error", e))?;
    page.to_json().map_err(|e| js_error("Serialization error", e))
}

/// Integrity diagnostics for a page as JSON
#[wasm_bindgen(js_name = auditPage)]
pub fn audit_page_js(page_json: &str, templates_json: &str) -> Result<String, JsValue> {
    let document: blockframe_editor::PageDocument =
        serde_json::from_str(page_json).map_err(|e| js_error("Page error", e))?;
    let templates = load_store(templates_json).map_err(|e| js_error("Template error", e))?;

    let diagnostics = audit_page(&document.blocks, &SchemaRegistry::with_builtins(), Some(&templates));
    serde_json::to_string(&diagnostics).map_err(|e| js_error("Serialization error", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockframe_protocol::{Message, Outbox, StructuralOp};
    use blockframe_model::BlockId;

    const PAGE: &str = r#"{
        "path": "/front-page",
        "blocks": [
            { "id": "a", "type": "title", "fields": { "title": { "type": "text", "value": "Hello" } } },
            { "id": "b", "type": "text", "fields": { "text": { "type": "text", "value": "Body" } } }
        ]
    }"#;

    const TEMPLATE: &str = r#"{
        "name": "Landing",
        "nodes": [
            { "kind": "block", "block": { "id": "h", "type": "title", "fields": { "title": { "type": "text", "value": "Header" } } } },
            { "kind": "placeholder", "name": "main" }
        ]
    }"#;

    fn envelopes(json: &str) -> Vec<Envelope> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_push_state_and_remove_round_trip() {
        let mut handle = ControlPanelHandle::new(PAGE, "[]", "").unwrap();
        let pushed = envelopes(&handle.push_state().unwrap());
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].message.kind(), "INITIAL_STATE");

        let mut preview = Outbox::new("preview");
        let request = preview.seal(Message::StructuralCommand(StructuralOp::Remove {
            block_id: BlockId::from("b"),
        }));
        let result = handle.handle_message(&request.to_json().unwrap()).unwrap();

        assert!(result.changed());
        assert!(result.error().is_none());
        assert_eq!(envelopes(&result.outgoing()).len(), 1);
        assert!(!handle.page_json().unwrap().contains("\"b\""));
    }

    #[test]
    fn test_refused_request_reports_error_and_resyncs() {
        let mut handle = ControlPanelHandle::new(PAGE, "[]", "").unwrap();
        let mut preview = Outbox::new("preview");
        let request = preview.seal(Message::StructuralCommand(StructuralOp::Remove {
            block_id: BlockId::from("missing"),
        }));

        let result = handle.handle_message(&request.to_json().unwrap()).unwrap();
        assert!(!result.changed());
        assert!(result.error().is_some());
        assert_eq!(envelopes(&result.outgoing()).len(), 1);
    }

    #[test]
    fn test_merge_template_appends_fresh_instance() {
        let merged = merge_template_js(PAGE, TEMPLATE).unwrap();
        let page = Page::from_json(&merged).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page.blocks()[2].locked);
    }

    #[test]
    fn test_audit_page_clean() {
        let diagnostics = audit_page_js(PAGE, &format!("[{}]", TEMPLATE)).unwrap();
        assert_eq!(diagnostics, "[]");
    }
}
