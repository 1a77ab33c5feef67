#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

use js_sys::{Object, Reflect};
use labframe_web::{EmbedHost, EmbedReporter, linked_html};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlIFrameElement;

wasm_bindgen_test_configure!(run_in_browser);

fn options(pairs: &[(&str, JsValue)]) -> JsValue {
    let obj = Object::new();
    for (key, value) in pairs {
        Reflect::set(&obj, &JsValue::from_str(key), value).expect("set option");
    }
    obj.into()
}

fn resize(height: f64) -> JsValue {
    options(&[
        ("type", JsValue::from_str("resize")),
        ("height", JsValue::from_f64(height)),
    ])
}

fn get(obj: &JsValue, key: &str) -> JsValue {
    Reflect::get(obj, &JsValue::from_str(key)).expect("read field")
}

fn mount_iframe(id: &str) -> HtmlIFrameElement {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .expect("document");
    let iframe: HtmlIFrameElement = document
        .create_element("iframe")
        .expect("create iframe")
        .dyn_into()
        .expect("iframe element");
    iframe.set_id(id);
    document
        .body()
        .expect("body")
        .append_child(&iframe)
        .expect("append iframe");
    iframe
}

#[wasm_bindgen_test]
fn host_without_iframe_attaches_to_nothing() {
    let host = EmbedHost::attach(options(&[("iframeId", JsValue::from_str("absent"))]))
        .expect("valid options");
    assert!(host.is_none());
}

#[wasm_bindgen_test]
fn host_rejects_invalid_options() {
    assert!(EmbedHost::attach(options(&[("minHeight", JsValue::from_f64(0.0))])).is_err());
}

#[wasm_bindgen_test]
fn attaching_to_a_loaded_frame_requests_its_height() {
    let iframe = mount_iframe("labs-already-loaded");
    assert!(iframe.content_window().is_some());
    let host = EmbedHost::attach(options(&[(
        "iframeId",
        JsValue::from_str("labs-already-loaded"),
    )]))
    .expect("valid options")
    .expect("iframe present");
    assert_eq!(host.requests_sent(), 1.0);
    iframe.remove();
}

#[wasm_bindgen_test]
fn host_clamps_and_filters_messages() {
    let iframe = mount_iframe("labs-under-test");
    let mut host = EmbedHost::attach(options(&[
        ("iframeId", JsValue::from_str("labs-under-test")),
        ("minHeight", JsValue::from_f64(600.0)),
    ]))
    .expect("valid options")
    .expect("iframe present");
    assert!(host.applied_height().expect("fallback applied") >= 600);

    let outcome = host.handle_message("https://lab-gatekeeper.lovable.app", resize(450.0));
    assert_eq!(get(&outcome, "applied"), JsValue::TRUE);
    assert_eq!(host.applied_height(), Some(600));
    assert_eq!(iframe.style().get_property_value("height").ok().as_deref(), Some("600px"));

    let outcome = host.handle_message("https://attacker.example", resize(1200.0));
    assert_eq!(get(&outcome, "reason").as_string().as_deref(), Some("untrusted_origin"));
    assert_eq!(host.applied_height(), Some(600));

    host.disconnect();
    host.disconnect();
    let outcome = host.handle_message("https://lab-gatekeeper.lovable.app", resize(900.0));
    assert_eq!(get(&outcome, "reason").as_string().as_deref(), Some("disconnected"));
    iframe.remove();
}

#[wasm_bindgen_test]
fn reporter_teardown_is_idempotent() {
    let mut reporter = EmbedReporter::new(JsValue::UNDEFINED).expect("default options");
    reporter.start().expect("observers installed");
    assert_eq!(
        get(&reporter.stats(), "phase").as_string().as_deref(),
        Some("observing")
    );
    reporter.teardown();
    reporter.teardown();
    assert_eq!(reporter.report_now(), None);
    let stats = reporter.stats();
    assert_eq!(get(&stats, "phase").as_string().as_deref(), Some("torn_down"));
    if !reporter.is_embedded() {
        assert_eq!(get(&stats, "sent").as_f64(), Some(0.0));
    }
}

#[wasm_bindgen_test]
fn linked_html_escapes_and_links() {
    assert_eq!(
        linked_html("a < www.b.ro", Some("link".to_owned())),
        "a &lt; <a href=\"https://www.b.ro\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"link\">www.b.ro</a>"
    );
}
