#![forbid(unsafe_code)]

//! Height-sync wire messages.
//!
//! Two message kinds cross the frame boundary:
//! - `resize` (reporter -> host) carrying the measured document height, and
//! - `request-height` (host -> reporter) carrying nothing.
//!
//! Payloads arrive as loosely-typed records ([`RawMessage`]); the
//! [`MessageCodec`] turns them into [`FrameMessage`] values and back. Anything
//! that does not decode is simply not a message of this protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;

/// Wire tag of a resize report (without namespace).
pub const RESIZE_TAG: &str = "resize";
/// Wire tag of a height request (without namespace).
pub const REQUEST_HEIGHT_TAG: &str = "request-height";

/// Discriminant of a [`FrameMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Resize,
    RequestHeight,
}

impl MessageKind {
    /// Un-namespaced wire tag.
    #[must_use]
    pub const fn base_tag(self) -> &'static str {
        match self {
            Self::Resize => RESIZE_TAG,
            Self::RequestHeight => REQUEST_HEIGHT_TAG,
        }
    }
}

/// A decoded height-sync message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMessage {
    /// Measured document height in whole CSS pixels, always `> 0`.
    Resize { height: u32 },
    RequestHeight,
}

impl FrameMessage {
    #[must_use]
    pub const fn kind(self) -> MessageKind {
        match self {
            Self::Resize { .. } => MessageKind::Resize,
            Self::RequestHeight => MessageKind::RequestHeight,
        }
    }
}

/// Inbound or outbound payload as it exists on the transport.
///
/// Both fields are kept as raw JSON values so that shape errors surface in
/// [`MessageCodec::decode`] rather than in deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
}

impl RawMessage {
    /// Payload with only a `type` tag.
    #[must_use]
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            kind: Some(Value::String(tag.into())),
            height: None,
        }
    }

    /// Attach a `height` value.
    #[must_use]
    pub fn with_height(mut self, height: impl Into<Value>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// The `type` field when it is a string.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.kind.as_ref().and_then(Value::as_str)
    }
}

/// Converts a measured CSS pixel height into a wire height.
///
/// Fractional heights round up so the frame never clips its last pixel row.
/// Returns `None` for anything that is not a positive finite value fitting `u32`.
#[must_use]
pub fn height_from_css_px(px: f64) -> Option<u32> {
    if !px.is_finite() || px <= 0.0 {
        return None;
    }
    let whole = px.ceil();
    if whole > f64::from(u32::MAX) {
        return None;
    }
    Some(whole as u32)
}

/// Encoder/decoder for one deployment's message vocabulary.
///
/// An optional namespace prefixes every tag (`"<ns>-resize"`), keeping the
/// protocol apart from other `postMessage` traffic on the same page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageCodec {
    namespace: Option<String>,
}

impl MessageCodec {
    /// Codec using the bare tags `resize` / `request-height`.
    #[must_use]
    pub const fn new() -> Self {
        Self { namespace: None }
    }

    /// Codec prefixing tags with `namespace-`. An empty namespace means none.
    #[must_use]
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = namespace.trim();
        Self {
            namespace: (!namespace.is_empty()).then(|| namespace.to_owned()),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Full wire tag for `kind`.
    #[must_use]
    pub fn tag(&self, kind: MessageKind) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}-{}", kind.base_tag()),
            None => kind.base_tag().to_owned(),
        }
    }

    #[must_use]
    pub fn encode(&self, message: &FrameMessage) -> RawMessage {
        let raw = RawMessage::tagged(self.tag(message.kind()));
        match *message {
            FrameMessage::Resize { height } => raw.with_height(height),
            FrameMessage::RequestHeight => raw,
        }
    }

    pub fn decode(&self, raw: &RawMessage) -> Result<FrameMessage, DecodeError> {
        let tag = raw.tag().ok_or(DecodeError::MissingType)?;
        match self.kind_for_tag(tag) {
            Some(MessageKind::RequestHeight) => Ok(FrameMessage::RequestHeight),
            Some(MessageKind::Resize) => {
                let value = raw.height.as_ref().ok_or(DecodeError::MissingHeight)?;
                let height = value
                    .as_f64()
                    .and_then(height_from_css_px)
                    .ok_or(DecodeError::InvalidHeight)?;
                Ok(FrameMessage::Resize { height })
            }
            None => Err(DecodeError::UnknownType(tag.to_owned())),
        }
    }

    /// Compact JSON form of `message`.
    #[must_use]
    pub fn to_json(&self, message: &FrameMessage) -> String {
        let raw = self.encode(message);
        let mut object = serde_json::Map::new();
        if let Some(kind) = raw.kind {
            object.insert("type".to_owned(), kind);
        }
        if let Some(height) = raw.height {
            object.insert("height".to_owned(), height);
        }
        Value::Object(object).to_string()
    }

    /// Decode a JSON document. Non-object documents are [`DecodeError::NotAnObject`].
    pub fn from_json(&self, json: &str) -> Result<FrameMessage, DecodeError> {
        let value: Value = serde_json::from_str(json).map_err(|_| DecodeError::NotAnObject)?;
        self.decode(&raw_from_value(value)?)
    }

    fn kind_for_tag(&self, tag: &str) -> Option<MessageKind> {
        let base = match &self.namespace {
            Some(ns) => tag.strip_prefix(ns.as_str())?.strip_prefix('-')?,
            None => tag,
        };
        match base {
            RESIZE_TAG => Some(MessageKind::Resize),
            REQUEST_HEIGHT_TAG => Some(MessageKind::RequestHeight),
            _ => None,
        }
    }
}

/// Lift an arbitrary JSON value into a [`RawMessage`].
pub fn raw_from_value(value: Value) -> Result<RawMessage, DecodeError> {
    match value {
        Value::Object(mut object) => Ok(RawMessage {
            kind: object.remove("type"),
            height: object.remove("height"),
        }),
        _ => Err(DecodeError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn bare_codec_uses_plain_tags() {
        let codec = MessageCodec::new();
        assert_eq!(
            codec.to_json(&FrameMessage::Resize { height: 900 }),
            r#"{"height":900,"type":"resize"}"#
        );
        assert_eq!(
            codec.to_json(&FrameMessage::RequestHeight),
            r#"{"type":"request-height"}"#
        );
    }

    #[test]
    fn namespaced_codec_prefixes_tags() {
        let codec = MessageCodec::with_namespace("icmpp");
        assert_eq!(codec.tag(MessageKind::Resize), "icmpp-resize");
        assert_eq!(
            codec.from_json(r#"{"type":"icmpp-request-height"}"#),
            Ok(FrameMessage::RequestHeight)
        );
        assert_eq!(
            codec.from_json(r#"{"type":"resize","height":10}"#),
            Err(DecodeError::UnknownType("resize".to_owned()))
        );
    }

    #[test]
    fn blank_namespace_is_no_namespace() {
        assert_eq!(MessageCodec::with_namespace("  "), MessageCodec::new());
    }

    #[test]
    fn fractional_height_rounds_up() {
        let raw = RawMessage::tagged("resize").with_height(json!(450.2));
        assert_eq!(
            MessageCodec::new().decode(&raw),
            Ok(FrameMessage::Resize { height: 451 })
        );
    }

    #[test]
    fn malformed_heights_are_rejected() {
        let codec = MessageCodec::new();
        for height in [json!(0), json!(-5), json!("900"), json!(true), json!(1e12)] {
            let raw = RawMessage::tagged("resize").with_height(height.clone());
            assert_eq!(
                codec.decode(&raw),
                Err(DecodeError::InvalidHeight),
                "height {height} should be rejected"
            );
        }
        assert_eq!(
            codec.decode(&RawMessage::tagged("resize")),
            Err(DecodeError::MissingHeight)
        );
    }

    #[test]
    fn non_object_and_untyped_payloads_are_rejected() {
        let codec = MessageCodec::new();
        assert_eq!(codec.from_json("\"resize\""), Err(DecodeError::NotAnObject));
        assert_eq!(codec.from_json("not json"), Err(DecodeError::NotAnObject));
        assert_eq!(
            codec.from_json(r#"{"type":7,"height":10}"#),
            Err(DecodeError::MissingType)
        );
    }

    #[test]
    fn request_height_ignores_extra_fields() {
        assert_eq!(
            MessageCodec::new().from_json(r#"{"type":"request-height","height":"x","v":2}"#),
            Ok(FrameMessage::RequestHeight)
        );
    }

    #[test]
    fn css_px_conversion_bounds() {
        assert_eq!(height_from_css_px(0.0), None);
        assert_eq!(height_from_css_px(f64::NAN), None);
        assert_eq!(height_from_css_px(f64::INFINITY), None);
        assert_eq!(height_from_css_px(0.01), Some(1));
        assert_eq!(height_from_css_px(1200.0), Some(1200));
    }
}
