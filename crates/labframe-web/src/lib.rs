#![forbid(unsafe_code)]

//! WASM bindings for the laboratories embed.
//!
//! Exports, via `wasm-bindgen`:
//! - `EmbedReporter`: runs inside the iframe (the laboratories app) and
//!   reports the document height to the embedding page,
//! - `EmbedHost`: runs on the WordPress page and sizes the iframe,
//! - `linkedHtml`: URL linkification for lab descriptions,
//! - `initConsoleLogging`: routes `tracing` output to the browser console.
//!
//! All protocol decisions live in `labframe-core`; this crate only binds
//! browser objects to its ports. Browser code compiles on `wasm32` only;
//! option parsing is shared and tested natively.

pub mod options;

#[cfg(target_arch = "wasm32")]
mod console;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod host;
#[cfg(target_arch = "wasm32")]
mod reporter;
#[cfg(target_arch = "wasm32")]
mod text;

#[cfg(target_arch = "wasm32")]
pub use console::init_console_logging;
#[cfg(target_arch = "wasm32")]
pub use host::EmbedHost;
#[cfg(target_arch = "wasm32")]
pub use reporter::EmbedReporter;
#[cfg(target_arch = "wasm32")]
pub use text::linked_html;

pub use options::{config_from_options_json, parse_log_level};

/// Parse a JS options value (`undefined`, `null` or a plain object).
#[cfg(target_arch = "wasm32")]
fn config_from_js(
    options: &wasm_bindgen::JsValue,
) -> Result<labframe_core::EmbedConfig, wasm_bindgen::JsValue> {
    if options.is_undefined() || options.is_null() {
        return Ok(labframe_core::EmbedConfig::default());
    }
    let json = js_sys::JSON::stringify(options)?
        .as_string()
        .unwrap_or_default();
    config_from_options_json(&json).map_err(js_error)
}

/// Convert a protocol error into the string thrown to JS callers.
#[cfg(target_arch = "wasm32")]
fn js_error(err: impl Into<labframe_core::FrameError>) -> wasm_bindgen::JsValue {
    wasm_bindgen::JsValue::from_str(&err.into().to_string())
}
