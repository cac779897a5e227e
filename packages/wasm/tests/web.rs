//! Browser-side checks, run with `wasm-pack test --headless --firefox`
#![cfg(target_arch = "wasm32")]

use blockframe_wasm::{merge_template_js, ControlPanelHandle};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const PAGE: &str = r#"{ "path": "/p", "blocks": [ { "id": "a", "type": "text" } ] }"#;

#[wasm_bindgen_test]
fn test_invalid_page_is_a_js_error() {
    assert!(ControlPanelHandle::new("{", "[]", "").is_err());
}

#[wasm_bindgen_test]
fn test_unknown_template_json_is_a_js_error() {
    assert!(merge_template_js(PAGE, "not json").is_err());
}

#[wasm_bindgen_test]
fn test_push_state_is_an_envelope_array() {
    let mut handle = ControlPanelHandle::new(PAGE, "[]", "").unwrap();
    let outgoing = handle.push_state().unwrap();
    assert!(outgoing.starts_with('['));
    assert!(outgoing.contains("INITIAL_STATE"));
}
