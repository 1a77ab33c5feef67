#![forbid(unsafe_code)]

use labframe_text::LinkifyOptions;
use wasm_bindgen::prelude::wasm_bindgen;

/// Escape `text` and turn its URLs into anchors opening in a new tab.
#[wasm_bindgen(js_name = linkedHtml)]
pub fn linked_html(text: &str, class_name: Option<String>) -> String {
    let options = LinkifyOptions {
        class: class_name,
        ..LinkifyOptions::default()
    };
    labframe_text::linked_html(text, &options)
}
