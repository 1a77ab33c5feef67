#![forbid(unsafe_code)]

//! Embed configuration.
//!
//! Every field has a default matching the production WordPress embed, so an
//! empty JSON object (`{}`) is a complete configuration.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::message::MessageCodec;
use crate::origin::{OriginMatchMode, OriginPolicy};

/// Element id the host page gives the embedding `<iframe>`.
pub const DEFAULT_IFRAME_ID: &str = "icmpp-labs";
/// Floor below which the iframe is never shrunk, in CSS pixels.
pub const DEFAULT_MIN_HEIGHT: u32 = 600;
/// Share of the viewport used as the height before the first report arrives.
pub const DEFAULT_FALLBACK_VIEWPORT_FRACTION: f64 = 0.8;
/// Quiet period for mutation-triggered reports.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
/// Upper bound accepted for `debounce_ms`.
pub const MAX_DEBOUNCE_MS: u64 = 10_000;
/// Namespace used by the deployed embed script.
pub const ICMPP_NAMESPACE: &str = "icmpp";
/// Deployment origins serving the laboratories app.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://lab-gatekeeper.lovable.app",
    "https://id-preview--338bf5c8-aab9-4044-bce6-4523e034e1a6.lovable.app",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbedConfig {
    pub iframe_id: String,
    pub min_height: u32,
    pub fallback_viewport_fraction: f64,
    pub debounce_ms: u64,
    pub allowed_origins: Vec<String>,
    pub origin_match: OriginMatchMode,
    /// Tag prefix; empty means bare `resize` / `request-height`.
    pub namespace: String,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            iframe_id: DEFAULT_IFRAME_ID.to_owned(),
            min_height: DEFAULT_MIN_HEIGHT,
            fallback_viewport_fraction: DEFAULT_FALLBACK_VIEWPORT_FRACTION,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|origin| (*origin).to_owned())
                .collect(),
            origin_match: OriginMatchMode::Strict,
            namespace: String::new(),
        }
    }
}

impl EmbedConfig {
    /// Defaults plus the `icmpp` namespace spoken by the deployed embed script.
    #[must_use]
    pub fn icmpp_deployment() -> Self {
        Self {
            namespace: ICMPP_NAMESPACE.to_owned(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iframe_id.trim().is_empty() {
            return Err(ConfigError::EmptyIframeId);
        }
        if self.min_height == 0 {
            return Err(ConfigError::ZeroMinHeight);
        }
        let fraction = self.fallback_viewport_fraction;
        if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
            return Err(ConfigError::FallbackFractionOutOfRange(fraction));
        }
        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::DebounceOutOfRange(self.debounce_ms));
        }
        if self.allowed_origins.is_empty() {
            return Err(ConfigError::EmptyAllowList);
        }
        self.origin_policy().map(|_| ())
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn codec(&self) -> MessageCodec {
        MessageCodec::with_namespace(self.namespace.as_str())
    }

    /// Allow-list built from `allowed_origins` (without the host's own origin).
    pub fn origin_policy(&self) -> Result<OriginPolicy, ConfigError> {
        OriginPolicy::from_list(&self.allowed_origins, self.origin_match)
    }

    /// Height actually applied for a reported `height`.
    #[must_use]
    pub fn clamp_height(&self, height: u32) -> u32 {
        height.max(self.min_height)
    }

    /// Height applied before any report: `max(viewport * fraction, floor)`.
    ///
    /// A viewport the browser cannot report (zero, negative, NaN) yields the floor.
    #[must_use]
    pub fn fallback_height(&self, viewport_height: f64) -> u32 {
        let scaled = viewport_height * self.fallback_viewport_fraction;
        if !scaled.is_finite() || scaled <= 0.0 {
            return self.min_height;
        }
        let scaled = scaled.round().min(f64::from(u32::MAX)) as u32;
        self.clamp_height(scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EmbedConfig::from_json_str("{}"), Ok(EmbedConfig::default()));
    }

    #[test]
    fn camel_case_fields_override_defaults() {
        let config = EmbedConfig::from_json_str(
            r#"{
                "iframeId": "labs",
                "minHeight": 400,
                "debounceMs": 250,
                "allowedOrigins": ["https://labs.example"],
                "originMatch": "fragment",
                "namespace": "icmpp"
            }"#,
        )
        .expect("valid config");
        assert_eq!(config.iframe_id, "labs");
        assert_eq!(config.min_height, 400);
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.origin_match, OriginMatchMode::Fragment);
        assert_eq!(config.codec().namespace(), Some("icmpp"));
        assert_eq!(config.fallback_viewport_fraction, DEFAULT_FALLBACK_VIEWPORT_FRACTION);
    }

    #[test]
    fn validation_rejects_out_of_range_fields() {
        let cases: Vec<(EmbedConfig, ConfigError)> = vec![
            (
                EmbedConfig {
                    iframe_id: " ".to_owned(),
                    ..EmbedConfig::default()
                },
                ConfigError::EmptyIframeId,
            ),
            (
                EmbedConfig {
                    min_height: 0,
                    ..EmbedConfig::default()
                },
                ConfigError::ZeroMinHeight,
            ),
            (
                EmbedConfig {
                    fallback_viewport_fraction: 1.5,
                    ..EmbedConfig::default()
                },
                ConfigError::FallbackFractionOutOfRange(1.5),
            ),
            (
                EmbedConfig {
                    debounce_ms: 0,
                    ..EmbedConfig::default()
                },
                ConfigError::DebounceOutOfRange(0),
            ),
            (
                EmbedConfig {
                    allowed_origins: Vec::new(),
                    ..EmbedConfig::default()
                },
                ConfigError::EmptyAllowList,
            ),
            (
                EmbedConfig {
                    allowed_origins: vec!["lovable".to_owned()],
                    ..EmbedConfig::default()
                },
                ConfigError::InvalidOrigin("lovable".to_owned()),
            ),
            (
                EmbedConfig {
                    allowed_origins: vec!["https://.lovable.app".to_owned()],
                    origin_match: OriginMatchMode::Fragment,
                    ..EmbedConfig::default()
                },
                ConfigError::InvalidOrigin("https://.lovable.app".to_owned()),
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn unparseable_document_reports_parse_error() {
        assert!(matches!(
            EmbedConfig::from_json_str("{\"minHeight\": \"tall\"}"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn fallback_height_takes_larger_of_fraction_and_floor() {
        let config = EmbedConfig::default();
        assert_eq!(config.fallback_height(1000.0), 800);
        assert_eq!(config.fallback_height(500.0), 600);
        assert_eq!(config.fallback_height(0.0), 600);
        assert_eq!(config.fallback_height(f64::NAN), 600);
    }

    #[test]
    fn deployment_preset_only_changes_namespace() {
        let preset = EmbedConfig::icmpp_deployment();
        assert_eq!(preset.namespace, ICMPP_NAMESPACE);
        assert_eq!(
            EmbedConfig {
                namespace: String::new(),
                ..preset
            },
            EmbedConfig::default()
        );
    }
}
