#![forbid(unsafe_code)]

//! Origin allow-list for inbound height reports.
//!
//! The host only trusts `resize` messages whose sender origin is on the
//! allow-list. Two matching modes exist:
//! - [`OriginMatchMode::Strict`] compares scheme, host and port exactly.
//! - [`OriginMatchMode::Fragment`] accepts any sender whose origin string
//!   contains the first DNS label of an allowed host. This is how the
//!   deployed embed script on the WordPress site matches, and it admits
//!   look-alike origins (`https://lab-gatekeeper.evil.test` passes for
//!   `https://lab-gatekeeper.lovable.app`). Opt-in only.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How sender origins are compared against the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginMatchMode {
    #[default]
    Strict,
    Fragment,
}

/// Canonical `scheme://host[:port]` triple.
///
/// Hosts are lower-cased and default ports (80 for http, 443 for https) are
/// dropped so that `https://Example.org:443` equals `https://example.org`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    scheme: String,
    host: String,
    port: Option<u16>,
}

impl Origin {
    /// Parse a serialized origin. A trailing path is tolerated and discarded.
    ///
    /// Returns `None` for opaque origins (`"null"`), user-info, control
    /// characters, or anything without a `scheme://host` shape.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("null")
            || trimmed.chars().any(char::is_control)
        {
            return None;
        }

        let (scheme, rest) = trimmed.split_once("://")?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
        {
            return None;
        }
        let scheme = scheme.to_ascii_lowercase();

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if authority.is_empty() || authority.contains('@') {
            return None;
        }

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let end = bracketed.find(']')?;
            let host = &bracketed[..end];
            let tail = &bracketed[end + 1..];
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(port.parse::<u16>().ok()?),
                None if tail.is_empty() => None,
                None => return None,
            };
            (host, port)
        } else {
            match authority.split_once(':') {
                Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
                None => (authority, None),
            }
        };

        let host = host.trim_end_matches('.');
        if host.is_empty()
            || host
                .chars()
                .any(|ch| ch.is_whitespace() || matches!(ch, '[' | ']'))
        {
            return None;
        }
        // `.lovable.app` or `a..b` would give an empty DNS label.
        if !host.contains(':') && host.split('.').any(str::is_empty) {
            return None;
        }

        let port = port.filter(|&port| default_port(&scheme) != Some(port));
        Some(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
        })
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit non-default port.
    #[must_use]
    pub const fn port(&self) -> Option<u16> {
        self.port
    }

    /// Leading DNS label of the host, used by [`OriginMatchMode::Fragment`].
    #[must_use]
    pub fn leading_label(&self) -> &str {
        self.host.split('.').next().unwrap_or(&self.host)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host_is_v6 = self.host.contains(':');
        match (host_is_v6, self.port) {
            (true, Some(port)) => write!(f, "{}://[{}]:{port}", self.scheme, self.host),
            (true, None) => write!(f, "{}://[{}]", self.scheme, self.host),
            (false, Some(port)) => write!(f, "{}://{}:{port}", self.scheme, self.host),
            (false, None) => write!(f, "{}://{}", self.scheme, self.host),
        }
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Set of trusted sender origins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginPolicy {
    entries: Vec<Origin>,
    mode: OriginMatchMode,
}

impl OriginPolicy {
    /// Empty policy. An empty policy trusts nobody.
    #[must_use]
    pub const fn new(mode: OriginMatchMode) -> Self {
        Self {
            entries: Vec::new(),
            mode,
        }
    }

    /// Build from serialized origins, failing on the first unparseable entry.
    pub fn from_list<I, S>(origins: I, mode: OriginMatchMode) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new(mode);
        for origin in origins {
            policy.allow(origin.as_ref())?;
        }
        Ok(policy)
    }

    /// Add one origin. Duplicates are collapsed.
    pub fn allow(&mut self, raw: &str) -> Result<(), ConfigError> {
        let origin = Origin::parse(raw).ok_or_else(|| ConfigError::InvalidOrigin(raw.to_owned()))?;
        if !self.entries.contains(&origin) {
            self.entries.push(origin);
        }
        Ok(())
    }

    /// Trust the host page's own origin as well.
    ///
    /// Opaque origins (a page opened from `file://` reports `"null"`) cannot
    /// be trusted and are skipped.
    #[must_use]
    pub fn with_own_origin(mut self, own: &str) -> Self {
        if self.allow(own).is_err() {
            tracing::debug!(origin = own, "own origin is opaque; not added to allow-list");
        }
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[Origin] {
        &self.entries
    }

    #[must_use]
    pub const fn mode(&self) -> OriginMatchMode {
        self.mode
    }

    /// Whether a message from `sender` may affect the host.
    #[must_use]
    pub fn allows(&self, sender: &str) -> bool {
        match self.mode {
            OriginMatchMode::Strict => match Origin::parse(sender) {
                Some(origin) => self.entries.contains(&origin),
                None => false,
            },
            OriginMatchMode::Fragment => {
                let sender = sender.to_ascii_lowercase();
                self.entries
                    .iter()
                    .map(Origin::leading_label)
                    .filter(|label| !label.is_empty())
                    .any(|label| sender.contains(label))
            }
        }
    }
}
