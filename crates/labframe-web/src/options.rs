#![forbid(unsafe_code)]

//! Option parsing shared by the JS-facing constructors.
//!
//! JS callers pass a plain options object. The wasm layer serializes it with
//! `JSON.stringify` and hands the text here, so the rules are testable
//! natively. Keys may be camelCase (`minHeight`) or snake_case
//! (`min_height`); `null`/`undefined` means "all defaults".

use labframe_core::{ConfigError, EmbedConfig};
use serde_json::{Map, Value};

/// Build and validate an [`EmbedConfig`] from serialized JS options.
pub fn config_from_options_json(json: &str) -> Result<EmbedConfig, ConfigError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(EmbedConfig::default());
    }
    let value: Value =
        serde_json::from_str(trimmed).map_err(|err| ConfigError::Parse(err.to_string()))?;
    let normalized = match value {
        Value::Null => Value::Object(Map::new()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camel_case_key(&key), value))
                .collect(),
        ),
        _ => return Err(ConfigError::Parse("options must be an object".to_owned())),
    };
    let config: EmbedConfig =
        serde_json::from_value(normalized).map_err(|err| ConfigError::Parse(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Max level for console logging; unknown or missing names fall back to `INFO`.
#[must_use]
pub fn parse_log_level(level: Option<&str>) -> tracing::Level {
    level
        .and_then(|name| name.trim().parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO)
}

fn camel_case_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use labframe_core::OriginMatchMode;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_options_mean_defaults() {
        assert_eq!(config_from_options_json(""), Ok(EmbedConfig::default()));
        assert_eq!(config_from_options_json("null"), Ok(EmbedConfig::default()));
        assert_eq!(config_from_options_json("{}"), Ok(EmbedConfig::default()));
    }

    #[test]
    fn snake_and_camel_keys_are_equivalent() {
        let camel = config_from_options_json(
            r#"{"iframeId":"labs","minHeight":500,"originMatch":"fragment"}"#,
        )
        .expect("valid");
        let snake = config_from_options_json(
            r#"{"iframe_id":"labs","min_height":500,"origin_match":"fragment"}"#,
        )
        .expect("valid");
        assert_eq!(camel, snake);
        assert_eq!(camel.origin_match, OriginMatchMode::Fragment);
    }

    #[test]
    fn invalid_values_surface_config_errors() {
        assert_eq!(
            config_from_options_json(r#"{"minHeight":0}"#),
            Err(ConfigError::ZeroMinHeight)
        );
        assert!(matches!(
            config_from_options_json("[1,2]"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case_key("fallback_viewport_fraction"), "fallbackViewportFraction");
        assert_eq!(camel_case_key("debounceMs"), "debounceMs");
        assert_eq!(camel_case_key("_namespace"), "namespace");
    }

    #[test]
    fn log_level_names() {
        assert_eq!(parse_log_level(Some("debug")), tracing::Level::DEBUG);
        assert_eq!(parse_log_level(Some("WARN")), tracing::Level::WARN);
        assert_eq!(parse_log_level(Some("chatty")), tracing::Level::INFO);
        assert_eq!(parse_log_level(None), tracing::Level::INFO);
    }
}
