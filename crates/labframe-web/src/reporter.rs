#![forbid(unsafe_code)]

//! JS handle for the embedded content reporter.
//!
//! ```js
//! const reporter = new EmbedReporter({ namespace: "icmpp" });
//! reporter.start();          // on mount
//! reporter.reportNow();      // after a route change, if desired
//! reporter.teardown();       // on unmount
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect};
use labframe_core::{EmbedConfig, EmbeddedReporter, ReportOutcome, ReportTrigger};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MessageEvent, MutationObserver, MutationObserverInit, Window};

use crate::config_from_js;
use crate::console::install_panic_hook;
use crate::dom::{DocumentProbe, TimeoutTimer, WindowParent, raw_message_from_js, set_js};

type WebReporter = EmbeddedReporter<WindowParent, DocumentProbe, TimeoutTimer>;
type SharedReporter = Rc<RefCell<WebReporter>>;

/// Observers and listeners installed by [`EmbedReporter::start`].
///
/// Closures live here, outside the shared reporter, so a callback never runs
/// while its own storage is mutably borrowed.
struct ReporterListeners {
    window: Window,
    resize_observer: Option<JsValue>,
    mutation_observer: MutationObserver,
    on_layout: Closure<dyn FnMut()>,
    _on_mutation: Closure<dyn FnMut()>,
    on_resize: Closure<dyn FnMut()>,
    on_message: Closure<dyn FnMut(MessageEvent)>,
    on_timer: Closure<dyn FnMut()>,
}

impl ReporterListeners {
    fn register(&self, target: &Element) -> Result<(), JsValue> {
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_attributes(true);
        self.mutation_observer.observe_with_options(target, &init)?;
        self.window
            .add_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref())?;
        self.window
            .add_event_listener_with_callback("message", self.on_message.as_ref().unchecked_ref())
    }

    /// Undo [`Self::register`] and the resize observer. Safe after a partial
    /// registration.
    fn release(self) {
        if let Some(observer) = &self.resize_observer {
            call_method0(observer, "disconnect");
        }
        self.mutation_observer.disconnect();
        let _ = self
            .window
            .remove_event_listener_with_callback("resize", self.on_resize.as_ref().unchecked_ref());
        let _ = self.window.remove_event_listener_with_callback(
            "message",
            self.on_message.as_ref().unchecked_ref(),
        );
    }
}

fn call_method0(target: &JsValue, name: &str) {
    if let Ok(method) = Reflect::get(target, &JsValue::from_str(name)) {
        if let Ok(method) = method.dyn_into::<Function>() {
            let _ = method.call0(target);
        }
    }
}

/// Construct a `ResizeObserver` via reflection; `None` when the platform has none.
fn new_resize_observer(window: &Window, callback: &Function, target: &Element) -> Option<JsValue> {
    let ctor = Reflect::get(window.as_ref(), &JsValue::from_str("ResizeObserver"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    let observer = Reflect::construct(&ctor, &Array::of1(callback.as_ref())).ok()?;
    let observe = Reflect::get(&observer, &JsValue::from_str("observe"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    observe.call1(&observer, target.as_ref()).ok()?;
    Some(observer)
}

fn trigger_callback(shared: &SharedReporter, trigger: ReportTrigger) -> Closure<dyn FnMut()> {
    let weak = Rc::downgrade(shared);
    Closure::new(move || {
        if let Some(shared) = weak.upgrade() {
            if let Ok(mut reporter) = shared.try_borrow_mut() {
                reporter.on_trigger(trigger);
            }
        }
    })
}

#[wasm_bindgen]
pub struct EmbedReporter {
    shared: SharedReporter,
    window: Window,
    listeners: Option<ReporterListeners>,
}

#[wasm_bindgen]
impl EmbedReporter {
    /// Create a reporter. Nothing is observed until [`Self::start`].
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<EmbedReporter, JsValue> {
        install_panic_hook();
        let config: EmbedConfig = config_from_js(&options)?;
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let reporter = EmbeddedReporter::from_config(
            &config,
            WindowParent::new(window.clone()),
            DocumentProbe::new(document),
            TimeoutTimer::new(window.clone()),
        );
        Ok(Self {
            shared: Rc::new(RefCell::new(reporter)),
            window,
            listeners: None,
        })
    }

    /// Install observers and listeners, then push the initial height.
    pub fn start(&mut self) -> Result<(), JsValue> {
        if self.listeners.is_some() {
            return Ok(());
        }
        let document = self
            .window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let target: Element = match document.body() {
            Some(body) => body.into(),
            None => document
                .document_element()
                .ok_or_else(|| JsValue::from_str("document has no root element"))?,
        };

        let on_layout = trigger_callback(&self.shared, ReportTrigger::Layout);
        let on_mutation = trigger_callback(&self.shared, ReportTrigger::Mutation);
        let on_resize = trigger_callback(&self.shared, ReportTrigger::ViewportResize);

        let weak = Rc::downgrade(&self.shared);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let raw = raw_message_from_js(&event.data());
            if let Some(shared) = weak.upgrade() {
                if let Ok(mut reporter) = shared.try_borrow_mut() {
                    reporter.on_message(&raw);
                }
            }
        });

        let armed = self.shared.borrow().timer().armed_slot();
        let weak = Rc::downgrade(&self.shared);
        let on_timer = Closure::<dyn FnMut()>::new(move || {
            let Some(generation) = armed.take() else {
                return;
            };
            if let Some(shared) = weak.upgrade() {
                if let Ok(mut reporter) = shared.try_borrow_mut() {
                    reporter.on_timer(generation);
                }
            }
        });

        let mutation_observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
        let mut listeners = ReporterListeners {
            window: self.window.clone(),
            resize_observer: None,
            mutation_observer,
            on_layout,
            _on_mutation: on_mutation,
            on_resize,
            on_message,
            on_timer,
        };
        listeners.resize_observer = new_resize_observer(
            &self.window,
            listeners.on_layout.as_ref().unchecked_ref(),
            &target,
        );
        if listeners.resize_observer.is_none() {
            tracing::debug!("ResizeObserver unavailable; relying on resize and mutation events");
        }
        if let Err(err) = listeners.register(&target) {
            listeners.release();
            return Err(err);
        }

        {
            let mut reporter = self.shared.borrow_mut();
            reporter
                .timer_mut()
                .install(listeners.on_timer.as_ref().unchecked_ref::<Function>().clone());
            reporter.start();
        }

        self.listeners = Some(listeners);
        Ok(())
    }

    /// Measure and post immediately. Returns the posted height, if any.
    #[wasm_bindgen(js_name = reportNow)]
    pub fn report_now(&self) -> Option<u32> {
        match self.shared.try_borrow_mut().ok()?.report_now() {
            ReportOutcome::Sent { height } => Some(height),
            ReportOutcome::Dropped | ReportOutcome::Skipped(_) => None,
        }
    }

    /// `true` when running inside a frame.
    #[wasm_bindgen(js_name = isEmbedded)]
    pub fn is_embedded(&self) -> bool {
        use labframe_core::ParentPort;
        self.shared.borrow().parent().is_embedded()
    }

    /// Disconnect observers, remove listeners, cancel the pending timer.
    /// Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if let Ok(mut reporter) = self.shared.try_borrow_mut() {
            reporter.teardown();
        }
        if let Some(listeners) = self.listeners.take() {
            listeners.release();
        }
    }

    /// Diagnostic counters: `{ phase, sent, dropped, coalesced, requests }`.
    pub fn stats(&self) -> JsValue {
        let reporter = self.shared.borrow();
        let stats = reporter.stats();
        let obj = Object::new();
        let phase = match reporter.phase() {
            labframe_core::ReporterPhase::Idle => "idle",
            labframe_core::ReporterPhase::Observing => "observing",
            labframe_core::ReporterPhase::TornDown => "torn_down",
        };
        set_js(&obj, "phase", JsValue::from_str(phase));
        set_js(&obj, "sent", JsValue::from_f64(stats.sent as f64));
        set_js(&obj, "dropped", JsValue::from_f64(stats.dropped as f64));
        set_js(&obj, "coalesced", JsValue::from_f64(stats.coalesced as f64));
        set_js(&obj, "requests", JsValue::from_f64(stats.requests as f64));
        obj.into()
    }
}

impl Drop for EmbedReporter {
    fn drop(&mut self) {
        self.teardown();
    }
}
