#![forbid(unsafe_code)]

//! Seams between the protocol core and a browsing context.
//!
//! The core never calls a browser API itself. `labframe-web` implements these
//! traits over `web-sys`; tests implement them with recording fakes.

use crate::debounce::TimerTicket;
use crate::error::PortError;
use crate::message::RawMessage;

/// The reporter's view of its parent browsing context.
pub trait ParentPort {
    /// `true` when running inside a frame, `false` when top-level.
    fn is_embedded(&self) -> bool;

    /// Post a payload to the parent. Delivery is fire-and-forget.
    fn post(&mut self, message: &RawMessage) -> Result<(), PortError>;
}

/// Measures the embedded document.
pub trait LayoutProbe {
    /// Full scrollable height of the document root, in CSS pixels.
    fn document_height(&self) -> f64;
}

/// Single-slot timer owned by one reporter.
///
/// Scheduling replaces whatever ticket was scheduled before; the host calls
/// back with the ticket's generation when it elapses.
pub trait TimerPort {
    fn schedule(&mut self, ticket: TimerTicket);
    fn cancel(&mut self);
}

/// The host's handle on the embedding `<iframe>` element.
pub trait FramePort {
    /// Set the rendered height in CSS pixels.
    fn set_height(&mut self, px: u32);

    /// Post a payload into the frame's content window.
    fn post(&mut self, message: &RawMessage) -> Result<(), PortError>;
}

/// The page that embeds the iframe.
pub trait HostPage {
    type Frame: FramePort;

    fn find_frame(&self, id: &str) -> Option<Self::Frame>;

    /// Current viewport (inner window) height in CSS pixels.
    fn viewport_height(&self) -> f64;

    /// The page's own serialized origin, if the platform exposes one.
    fn own_origin(&self) -> Option<String>;
}
