#![forbid(unsafe_code)]

//! `labframe-core` is the deterministic core of the laboratories embed.
//!
//! The laboratories directory is served inside an `<iframe>` on the
//! institute's WordPress site. Two participants keep the frame's height in
//! step with its content:
//! - the [`EmbeddedReporter`] inside the frame measures the document and
//!   posts `resize` messages to its parent, and
//! - the [`HostController`] on the WordPress page validates those messages
//!   and resizes the frame, never below a floor.
//!
//! Design goals:
//! - **Host-driven I/O**: browser objects sit behind the traits in [`ports`];
//!   this crate has no `wasm-bindgen` dependency and is tested natively.
//! - **Explicit timers**: debouncing is a state machine handing out
//!   generation-stamped tickets ([`debounce`]).
//! - **Silent degradation**: no failure ever escapes to the page; the frame
//!   keeps its fallback height.

pub mod config;
pub mod debounce;
pub mod error;
pub mod host;
pub mod message;
pub mod origin;
pub mod ports;
pub mod reporter;

pub use config::EmbedConfig;
pub use debounce::{DebounceState, Debouncer, TimerTicket};
pub use error::{ConfigError, DecodeError, FrameError, PortError};
pub use host::{HostController, HostDispatch, HostIgnoredReason};
pub use message::{FrameMessage, MessageCodec, MessageKind, RawMessage};
pub use origin::{Origin, OriginMatchMode, OriginPolicy};
pub use ports::{FramePort, HostPage, LayoutProbe, ParentPort, TimerPort};
pub use reporter::{
    EmbeddedReporter, ReportOutcome, ReportSkipReason, ReportTrigger, ReporterPhase,
    ReporterStats, TriggerResponse,
};
