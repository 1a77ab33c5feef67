#![forbid(unsafe_code)]

//! JS handle for the host page controller (the WordPress side).
//!
//! ```html
//! <iframe id="icmpp-labs" src="https://lab-gatekeeper.lovable.app/labs?view=list"></iframe>
//! <script type="module">
//!   import init, { EmbedHost } from "./labframe_web.js";
//!   await init();
//!   EmbedHost.attach({ namespace: "icmpp" });
//! </script>
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Object;
use labframe_core::{HostController, HostDispatch, HostIgnoredReason};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlIFrameElement, MessageEvent, Window};

use crate::{config_from_js, js_error};
use crate::console::install_panic_hook;
use crate::dom::{IframeFrame, WindowPage, raw_message_from_js, set_js};

type SharedHost = Rc<RefCell<HostController<IframeFrame>>>;

struct HostListeners {
    window: Window,
    iframe: HtmlIFrameElement,
    on_message: Closure<dyn FnMut(MessageEvent)>,
    on_load: Closure<dyn FnMut()>,
}

impl HostListeners {
    fn register(&self) -> Result<(), JsValue> {
        self.window.add_event_listener_with_callback(
            "message",
            self.on_message.as_ref().unchecked_ref(),
        )?;
        self.iframe
            .add_event_listener_with_callback("load", self.on_load.as_ref().unchecked_ref())
    }

    /// Remove both listeners. Removing one that was never added is a no-op.
    fn release(self) {
        let _ = self.window.remove_event_listener_with_callback(
            "message",
            self.on_message.as_ref().unchecked_ref(),
        );
        let _ = self
            .iframe
            .remove_event_listener_with_callback("load", self.on_load.as_ref().unchecked_ref());
    }
}

fn ignored_reason_label(reason: HostIgnoredReason) -> &'static str {
    match reason {
        HostIgnoredReason::UntrustedOrigin => "untrusted_origin",
        HostIgnoredReason::Malformed => "malformed",
        HostIgnoredReason::UnexpectedKind => "unexpected_kind",
        HostIgnoredReason::Disconnected => "disconnected",
    }
}

pub(crate) fn dispatch_to_js(dispatch: HostDispatch) -> JsValue {
    let obj = Object::new();
    match dispatch {
        HostDispatch::Applied { height, clamped } => {
            set_js(&obj, "applied", JsValue::TRUE);
            set_js(&obj, "height", JsValue::from_f64(f64::from(height)));
            set_js(&obj, "clamped", JsValue::from_bool(clamped));
        }
        HostDispatch::Ignored(reason) => {
            set_js(&obj, "applied", JsValue::FALSE);
            set_js(&obj, "reason", JsValue::from_str(ignored_reason_label(reason)));
        }
    }
    obj.into()
}

#[wasm_bindgen]
pub struct EmbedHost {
    shared: SharedHost,
    listeners: Option<HostListeners>,
}

#[wasm_bindgen]
impl EmbedHost {
    /// Find the iframe, apply the fallback height and start listening.
    ///
    /// Resolves to `undefined` (after a console warning) when the page has
    /// no iframe with the configured id. Throws only for invalid options.
    pub fn attach(options: JsValue) -> Result<Option<EmbedHost>, JsValue> {
        install_panic_hook();
        let config = config_from_js(&options)?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let page = WindowPage::new(window.clone(), document);

        let controller = HostController::initialize(&page, config).map_err(js_error)?;
        let Some(controller) = controller else {
            return Ok(None);
        };
        let iframe = controller.frame().element().clone();
        let shared: SharedHost = Rc::new(RefCell::new(controller));

        let weak = Rc::downgrade(&shared);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let raw = raw_message_from_js(&event.data());
            if let Some(shared) = weak.upgrade() {
                if let Ok(mut controller) = shared.try_borrow_mut() {
                    controller.on_message(&event.origin(), &raw);
                }
            }
        });

        let weak = Rc::downgrade(&shared);
        let on_load = Closure::<dyn FnMut()>::new(move || {
            if let Some(shared) = weak.upgrade() {
                if let Ok(mut controller) = shared.try_borrow_mut() {
                    controller.on_frame_load();
                }
            }
        });

        let listeners = HostListeners {
            window,
            iframe,
            on_message,
            on_load,
        };
        if let Err(err) = listeners.register() {
            listeners.release();
            return Err(err);
        }

        // The frame may have loaded (and pushed its first height) before
        // this script ran; ask once now so that push is not lost.
        shared.borrow_mut().on_frame_load();

        Ok(Some(Self {
            shared,
            listeners: Some(listeners),
        }))
    }

    /// `request-height` messages delivered into the frame so far.
    #[wasm_bindgen(js_name = requestsSent)]
    pub fn requests_sent(&self) -> f64 {
        self.shared.borrow().requests_sent() as f64
    }

    /// Currently applied iframe height in CSS pixels.
    #[wasm_bindgen(js_name = appliedHeight)]
    pub fn applied_height(&self) -> Option<u32> {
        self.shared.borrow().applied_height()
    }

    /// Feed one message by hand (tests, or hosts with their own listener).
    ///
    /// Returns `{ applied, height?, clamped?, reason? }`.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, origin: &str, data: JsValue) -> JsValue {
        let raw = raw_message_from_js(&data);
        let dispatch = self.shared.borrow_mut().on_message(origin, &raw);
        dispatch_to_js(dispatch)
    }

    /// Ask the frame for its height now.
    #[wasm_bindgen(js_name = requestHeight)]
    pub fn request_height(&self) -> bool {
        self.shared.borrow_mut().on_frame_load()
    }

    /// Stop listening. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if let Ok(mut controller) = self.shared.try_borrow_mut() {
            controller.disconnect();
        }
        if let Some(listeners) = self.listeners.take() {
            listeners.release();
        }
    }
}

impl Drop for EmbedHost {
    fn drop(&mut self) {
        self.disconnect();
    }
}
