#![forbid(unsafe_code)]

//! Error types for the height-sync protocol.
//!
//! None of these ever reach an end user. The reporter and the host controller
//! degrade to "keep the current height" on every failure; the types exist so
//! that adapters and tests can tell the failure classes apart.

use core::fmt;

/// Why an inbound payload could not be decoded into a [`crate::FrameMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload was not a structured record (for example a plain string).
    NotAnObject,
    /// No `type` field, or it was not a string.
    MissingType,
    /// `type` was a string outside this protocol's vocabulary.
    UnknownType(String),
    /// A `resize` message without a `height` field.
    MissingHeight,
    /// `height` was present but not a positive finite number that fits in `u32`.
    InvalidHeight,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => f.write_str("payload is not an object"),
            Self::MissingType => f.write_str("payload has no string `type` field"),
            Self::UnknownType(kind) => write!(f, "unknown message type: {kind}"),
            Self::MissingHeight => f.write_str("resize message has no `height`"),
            Self::InvalidHeight => f.write_str("resize height is not a positive pixel value"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Invalid [`crate::EmbedConfig`] field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    EmptyIframeId,
    ZeroMinHeight,
    FallbackFractionOutOfRange(f64),
    DebounceOutOfRange(u64),
    EmptyAllowList,
    InvalidOrigin(String),
    /// The JSON document itself could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyIframeId => f.write_str("iframeId must not be empty"),
            Self::ZeroMinHeight => f.write_str("minHeight must be greater than zero"),
            Self::FallbackFractionOutOfRange(v) => {
                write!(f, "fallbackViewportFraction must be in (0, 1], got {v}")
            }
            Self::DebounceOutOfRange(ms) => {
                write!(f, "debounceMs must be in 1..=10000, got {ms}")
            }
            Self::EmptyAllowList => f.write_str("allowedOrigins must not be empty"),
            Self::InvalidOrigin(raw) => write!(f, "allowedOrigins contains an invalid origin: {raw}"),
            Self::Parse(msg) => write!(f, "invalid config document: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure reported by a transport port when posting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortError {
    /// The other browsing context could not be reached (detached, closed, absent).
    Unreachable,
    /// The platform refused access (cross-origin restriction).
    AccessDenied(String),
}

impl fmt::Display for PortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => f.write_str("target browsing context unreachable"),
            Self::AccessDenied(msg) => write!(f, "access denied: {msg}"),
        }
    }
}

impl std::error::Error for PortError {}

/// Umbrella error for adapters that want a single type.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    Decode(DecodeError),
    Config(ConfigError),
    Port(PortError),
    /// The iframe element with this id is not on the page.
    MissingTarget(String),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "decode: {err}"),
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Port(err) => write!(f, "port: {err}"),
            Self::MissingTarget(id) => write!(f, "iframe with id=\"{id}\" not found"),
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Port(err) => Some(err),
            Self::MissingTarget(_) => None,
        }
    }
}

impl From<DecodeError> for FrameError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<ConfigError> for FrameError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<PortError> for FrameError {
    fn from(err: PortError) -> Self {
        Self::Port(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_error_exposes_source() {
        let err = FrameError::from(DecodeError::MissingHeight);
        let source = std::error::Error::source(&err).expect("decode errors carry a source");
        assert_eq!(source.to_string(), "resize message has no `height`");
    }

    #[test]
    fn missing_target_names_the_id() {
        let err = FrameError::MissingTarget("icmpp-labs".to_owned());
        assert_eq!(err.to_string(), "iframe with id=\"icmpp-labs\" not found");
    }
}
