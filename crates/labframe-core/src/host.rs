#![forbid(unsafe_code)]

//! Host page controller.
//!
//! Owns the embedding `<iframe>` and keeps its height in sync with the
//! embedded document. The controller never shrinks the frame below the
//! configured floor, and every inbound message that is untrusted or
//! malformed is dropped without side effects and without log output.

use crate::config::EmbedConfig;
use crate::error::{ConfigError, FrameError};
use crate::message::{FrameMessage, MessageCodec, RawMessage};
use crate::origin::OriginPolicy;
use crate::ports::{FramePort, HostPage};

/// Deterministic reason an inbound message had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostIgnoredReason {
    UntrustedOrigin,
    Malformed,
    /// Well-formed, but not something the host acts on (`request-height`).
    UnexpectedKind,
    Disconnected,
}

/// Result of one inbound message dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostDispatch {
    Applied {
        height: u32,
        /// The reported height was below the floor.
        clamped: bool,
    },
    Ignored(HostIgnoredReason),
}

impl HostDispatch {
    #[must_use]
    pub const fn applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug)]
pub struct HostController<F> {
    frame: F,
    config: EmbedConfig,
    policy: OriginPolicy,
    codec: MessageCodec,
    applied_height: Option<u32>,
    requests_sent: u64,
    connected: bool,
}

impl<F: FramePort> HostController<F> {
    /// Locate the frame on `page`, trust the page's own origin, and apply the
    /// fallback height.
    ///
    /// A page without the frame is not an error: a warning is logged and
    /// `Ok(None)` returned so the script is safe to include anywhere.
    pub fn initialize<P>(page: &P, config: EmbedConfig) -> Result<Option<Self>, ConfigError>
    where
        P: HostPage<Frame = F>,
    {
        config.validate()?;
        let Some(frame) = page.find_frame(&config.iframe_id) else {
            let error = FrameError::MissingTarget(config.iframe_id.clone());
            tracing::warn!(%error, "embed iframe not found; height sync disabled");
            return Ok(None);
        };

        let mut policy = config.origin_policy()?;
        if let Some(own) = page.own_origin() {
            policy = policy.with_own_origin(&own);
        }

        let mut controller = Self::new(frame, config, policy);
        let fallback = controller.apply_fallback(page.viewport_height());
        tracing::info!(
            iframe_id = %controller.config.iframe_id,
            fallback_height = fallback,
            trusted_origins = controller.policy.entries().len(),
            "embed height sync initialized"
        );
        Ok(Some(controller))
    }

    /// Controller over an already located frame. No height is applied yet.
    pub fn new(frame: F, config: EmbedConfig, policy: OriginPolicy) -> Self {
        let codec = config.codec();
        Self {
            frame,
            config,
            policy,
            codec,
            applied_height: None,
            requests_sent: 0,
            connected: true,
        }
    }

    #[must_use]
    pub const fn applied_height(&self) -> Option<u32> {
        self.applied_height
    }

    /// `request-height` messages delivered into the frame so far.
    #[must_use]
    pub const fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    #[must_use]
    pub const fn config(&self) -> &EmbedConfig {
        &self.config
    }

    #[must_use]
    pub const fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    /// Size the frame from the viewport before any report has arrived.
    pub fn apply_fallback(&mut self, viewport_height: f64) -> u32 {
        let height = self.config.fallback_height(viewport_height);
        self.set_height(height);
        height
    }

    /// The frame finished loading: ask the content for its height once, in
    /// case its first push went out before our listener existed.
    pub fn on_frame_load(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        let request = self.codec.encode(&FrameMessage::RequestHeight);
        match self.frame.post(&request) {
            Ok(()) => {
                self.requests_sent = self.requests_sent.saturating_add(1);
                true
            }
            Err(err) => {
                let error = FrameError::from(err);
                tracing::debug!(%error, "height request not delivered; keeping fallback");
                false
            }
        }
    }

    pub fn on_message(&mut self, origin: &str, raw: &RawMessage) -> HostDispatch {
        if !self.connected {
            return HostDispatch::Ignored(HostIgnoredReason::Disconnected);
        }
        if !self.policy.allows(origin) {
            return HostDispatch::Ignored(HostIgnoredReason::UntrustedOrigin);
        }
        match self.codec.decode(raw) {
            Ok(FrameMessage::Resize { height }) => {
                let applied = self.config.clamp_height(height);
                self.set_height(applied);
                HostDispatch::Applied {
                    height: applied,
                    clamped: applied != height,
                }
            }
            Ok(FrameMessage::RequestHeight) => {
                HostDispatch::Ignored(HostIgnoredReason::UnexpectedKind)
            }
            Err(_) => HostDispatch::Ignored(HostIgnoredReason::Malformed),
        }
    }

    /// Stop reacting to messages and load events. Idempotent.
    pub fn disconnect(&mut self) -> bool {
        let was_connected = self.connected;
        self.connected = false;
        was_connected
    }

    fn set_height(&mut self, px: u32) {
        self.frame.set_height(px);
        self.applied_height = Some(px);
    }
}
