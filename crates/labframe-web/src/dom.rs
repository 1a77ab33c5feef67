#![forbid(unsafe_code)]

//! `web-sys` implementations of the core ports.

use std::cell::Cell;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect};
use labframe_core::{
    FramePort, HostPage, LayoutProbe, ParentPort, PortError, RawMessage, TimerPort, TimerTicket,
};
use serde_json::{Number, Value};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlIFrameElement, Window};

pub(crate) fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn describe_js_error(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| "unknown error".to_owned())
}

fn js_to_json(value: &JsValue) -> Option<Value> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    if let Some(text) = value.as_string() {
        return Some(Value::String(text));
    }
    if let Some(number) = value.as_f64() {
        // Non-finite numbers have no JSON form; keep them as text so the
        // codec classifies them as an invalid height.
        return Some(
            Number::from_f64(number).map_or_else(|| Value::String(number.to_string()), Value::Number),
        );
    }
    if let Some(flag) = value.as_bool() {
        return Some(Value::Bool(flag));
    }
    Some(Value::Object(serde_json::Map::new()))
}

/// Read the `type` / `height` fields of a `MessageEvent.data` value.
pub(crate) fn raw_message_from_js(data: &JsValue) -> RawMessage {
    if !data.is_object() {
        return RawMessage::default();
    }
    let field = |name: &str| {
        Reflect::get(data, &JsValue::from_str(name))
            .ok()
            .and_then(|value| js_to_json(&value))
    };
    RawMessage {
        kind: field("type"),
        height: field("height"),
    }
}

pub(crate) fn raw_message_to_js(raw: &RawMessage) -> JsValue {
    let obj = Object::new();
    if let Some(tag) = raw.tag() {
        set_js(&obj, "type", JsValue::from_str(tag));
    }
    if let Some(height) = raw.height.as_ref().and_then(Value::as_f64) {
        set_js(&obj, "height", JsValue::from_f64(height));
    }
    obj.into()
}

/// The reporter's parent browsing context.
pub(crate) struct WindowParent {
    window: Window,
}

impl WindowParent {
    pub(crate) fn new(window: Window) -> Self {
        Self { window }
    }
}

impl ParentPort for WindowParent {
    fn is_embedded(&self) -> bool {
        match self.window.parent() {
            Ok(Some(parent)) => !Object::is(parent.as_ref(), self.window.as_ref()),
            Ok(None) => false,
            // Reading `parent` only throws for a cross-origin embedder.
            Err(_) => true,
        }
    }

    fn post(&mut self, message: &RawMessage) -> Result<(), PortError> {
        let parent = self
            .window
            .parent()
            .map_err(|err| PortError::AccessDenied(describe_js_error(&err)))?
            .ok_or(PortError::Unreachable)?;
        parent
            .post_message(&raw_message_to_js(message), "*")
            .map_err(|err| PortError::AccessDenied(describe_js_error(&err)))
    }
}

/// Measures `document.documentElement.scrollHeight`.
pub(crate) struct DocumentProbe {
    document: Document,
}

impl DocumentProbe {
    pub(crate) fn new(document: Document) -> Self {
        Self { document }
    }
}

impl LayoutProbe for DocumentProbe {
    fn document_height(&self) -> f64 {
        self.document
            .document_element()
            .map_or(0.0, |root| f64::from(root.scroll_height()))
    }
}

/// Single-slot `setTimeout` timer.
///
/// The JS callback is owned by the reporter handle; this port only keeps a
/// reference to it plus the generation it should deliver.
pub(crate) struct TimeoutTimer {
    window: Window,
    callback: Option<Function>,
    handle: Option<i32>,
    armed: Rc<Cell<Option<u64>>>,
}

impl TimeoutTimer {
    pub(crate) fn new(window: Window) -> Self {
        Self {
            window,
            callback: None,
            handle: None,
            armed: Rc::new(Cell::new(None)),
        }
    }

    /// Slot the callback reads the live generation from.
    pub(crate) fn armed_slot(&self) -> Rc<Cell<Option<u64>>> {
        Rc::clone(&self.armed)
    }

    pub(crate) fn install(&mut self, callback: Function) {
        self.callback = Some(callback);
    }

    fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}

impl TimerPort for TimeoutTimer {
    fn schedule(&mut self, ticket: TimerTicket) {
        self.clear();
        let Some(callback) = self.callback.as_ref() else {
            return;
        };
        let delay_ms = i32::try_from(ticket.after.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback, delay_ms)
        {
            Ok(handle) => {
                self.armed.set(Some(ticket.generation));
                self.handle = Some(handle);
            }
            Err(err) => {
                tracing::debug!(error = %describe_js_error(&err), "setTimeout failed");
            }
        }
    }

    fn cancel(&mut self) {
        self.clear();
        self.armed.set(None);
    }
}

/// The host page's `<iframe>` element.
pub(crate) struct IframeFrame {
    element: HtmlIFrameElement,
}

impl IframeFrame {
    pub(crate) fn element(&self) -> &HtmlIFrameElement {
        &self.element
    }
}

impl FramePort for IframeFrame {
    fn set_height(&mut self, px: u32) {
        if let Err(err) = self
            .element
            .style()
            .set_property("height", &format!("{px}px"))
        {
            tracing::debug!(error = %describe_js_error(&err), "could not set iframe height");
        }
    }

    fn post(&mut self, message: &RawMessage) -> Result<(), PortError> {
        let content = self.element.content_window().ok_or(PortError::Unreachable)?;
        content
            .post_message(&raw_message_to_js(message), "*")
            .map_err(|err| PortError::AccessDenied(describe_js_error(&err)))
    }
}

/// The embedding page.
pub(crate) struct WindowPage {
    window: Window,
    document: Document,
}

impl WindowPage {
    pub(crate) fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }
}

impl HostPage for WindowPage {
    type Frame = IframeFrame;

    fn find_frame(&self, id: &str) -> Option<IframeFrame> {
        let element: Element = self.document.get_element_by_id(id)?;
        element
            .dyn_into::<HtmlIFrameElement>()
            .ok()
            .map(|element| IframeFrame { element })
    }

    fn viewport_height(&self) -> f64 {
        self.window
            .inner_height()
            .ok()
            .and_then(|height| height.as_f64())
            .unwrap_or(0.0)
    }

    fn own_origin(&self) -> Option<String> {
        self.window.location().origin().ok()
    }
}
