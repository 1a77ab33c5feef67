#![forbid(unsafe_code)]

//! Embedded content reporter.
//!
//! Runs inside the iframe and keeps the host informed of the document height.
//! Three stimuli drive reports:
//! - layout observation (`ResizeObserver` on the body): reported immediately,
//! - viewport resize events: reported immediately,
//! - DOM mutations: debounced, because they arrive in bursts.
//!
//! A `request-height` message from the host forces an immediate report
//! regardless of what was sent before. After [`EmbeddedReporter::teardown`]
//! nothing is ever posted again, including from timers that were in flight.

use core::time::Duration;

use crate::config::EmbedConfig;
use crate::debounce::{Debouncer, TimerTicket};
use crate::message::{FrameMessage, MessageCodec, RawMessage, height_from_css_px};
use crate::ports::{LayoutProbe, ParentPort, TimerPort};

/// Stimulus that may lead to a height report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTrigger {
    /// Size/layout observer callback.
    Layout,
    /// Window `resize` event.
    ViewportResize,
    /// DOM subtree mutation.
    Mutation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReporterPhase {
    #[default]
    Idle,
    Observing,
    TornDown,
}

/// Why a report was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSkipReason {
    /// Top-level context; there is no parent to talk to.
    NotEmbedded,
    /// Not started yet, or torn down.
    NotObserving,
    /// The document reported a zero or unusable height.
    NoMeasurement,
}

/// Result of one report attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    Sent { height: u32 },
    /// The parent refused the post; swallowed.
    Dropped,
    Skipped(ReportSkipReason),
}

/// What the reporter did with a stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResponse {
    Reported(ReportOutcome),
    /// A debounced report was (re)scheduled.
    Deferred(TimerTicket),
    Ignored,
}

/// Diagnostic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReporterStats {
    pub sent: u64,
    pub dropped: u64,
    /// Mutation triggers folded into an already pending report.
    pub coalesced: u64,
    pub requests: u64,
}

pub struct EmbeddedReporter<P, L, T> {
    parent: P,
    probe: L,
    timer: T,
    codec: MessageCodec,
    debouncer: Debouncer,
    phase: ReporterPhase,
    stats: ReporterStats,
}

impl<P, L, T> EmbeddedReporter<P, L, T>
where
    P: ParentPort,
    L: LayoutProbe,
    T: TimerPort,
{
    pub fn new(parent: P, probe: L, timer: T, codec: MessageCodec, debounce: Duration) -> Self {
        Self {
            parent,
            probe,
            timer,
            codec,
            debouncer: Debouncer::new(debounce),
            phase: ReporterPhase::Idle,
            stats: ReporterStats::default(),
        }
    }

    pub fn from_config(config: &EmbedConfig, parent: P, probe: L, timer: T) -> Self {
        Self::new(parent, probe, timer, config.codec(), config.debounce())
    }

    #[must_use]
    pub const fn phase(&self) -> ReporterPhase {
        self.phase
    }

    #[must_use]
    pub const fn stats(&self) -> ReporterStats {
        self.stats
    }

    #[must_use]
    pub const fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// Begin observing and push the initial height.
    ///
    /// Calling `start` on a running reporter only reports again; a torn down
    /// reporter cannot be restarted.
    pub fn start(&mut self) -> ReportOutcome {
        if self.phase == ReporterPhase::Idle {
            self.phase = ReporterPhase::Observing;
            tracing::info!(
                embedded = self.parent.is_embedded(),
                debounce_ms = self.debouncer.delay().as_millis() as u64,
                "height reporter started"
            );
        }
        self.report()
    }

    pub fn on_trigger(&mut self, trigger: ReportTrigger) -> TriggerResponse {
        if self.phase != ReporterPhase::Observing {
            return TriggerResponse::Ignored;
        }
        match trigger {
            ReportTrigger::Layout | ReportTrigger::ViewportResize => {
                TriggerResponse::Reported(self.report())
            }
            ReportTrigger::Mutation => {
                if self.debouncer.is_pending() {
                    self.stats.coalesced = self.stats.coalesced.saturating_add(1);
                }
                let ticket = self.debouncer.trigger();
                self.timer.schedule(ticket);
                TriggerResponse::Deferred(ticket)
            }
        }
    }

    /// The timer scheduled under `generation` elapsed.
    pub fn on_timer(&mut self, generation: u64) -> TriggerResponse {
        if self.phase != ReporterPhase::Observing {
            return TriggerResponse::Ignored;
        }
        match self.debouncer.fire(generation) {
            Some(_) => TriggerResponse::Reported(self.report()),
            None => TriggerResponse::Ignored,
        }
    }

    /// Inbound payload from any origin. Only `request-height` is acted on.
    pub fn on_message(&mut self, raw: &RawMessage) -> TriggerResponse {
        if self.phase != ReporterPhase::Observing {
            return TriggerResponse::Ignored;
        }
        match self.codec.decode(raw) {
            Ok(FrameMessage::RequestHeight) => {
                self.stats.requests = self.stats.requests.saturating_add(1);
                TriggerResponse::Reported(self.report())
            }
            Ok(FrameMessage::Resize { .. }) | Err(_) => TriggerResponse::Ignored,
        }
    }

    /// Report immediately, outside any stimulus.
    pub fn report_now(&mut self) -> ReportOutcome {
        self.report()
    }

    /// Release the timer and stop reporting. Idempotent.
    pub fn teardown(&mut self) -> bool {
        if self.phase == ReporterPhase::TornDown {
            return false;
        }
        self.debouncer.cancel();
        self.timer.cancel();
        self.phase = ReporterPhase::TornDown;
        tracing::info!(
            sent = self.stats.sent,
            dropped = self.stats.dropped,
            "height reporter torn down"
        );
        true
    }

    fn report(&mut self) -> ReportOutcome {
        if self.phase != ReporterPhase::Observing {
            return ReportOutcome::Skipped(ReportSkipReason::NotObserving);
        }
        if !self.parent.is_embedded() {
            return ReportOutcome::Skipped(ReportSkipReason::NotEmbedded);
        }
        let Some(height) = height_from_css_px(self.probe.document_height()) else {
            return ReportOutcome::Skipped(ReportSkipReason::NoMeasurement);
        };

        let message = self.codec.encode(&FrameMessage::Resize { height });
        match self.parent.post(&message) {
            Ok(()) => {
                self.stats.sent = self.stats.sent.saturating_add(1);
                tracing::trace!(height, "height reported");
                ReportOutcome::Sent { height }
            }
            Err(err) => {
                self.stats.dropped = self.stats.dropped.saturating_add(1);
                tracing::debug!(error = %err, "height report dropped");
                ReportOutcome::Dropped
            }
        }
    }
}

impl<P, L, T> core::fmt::Debug for EmbeddedReporter<P, L, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmbeddedReporter")
            .field("phase", &self.phase)
            .field("debouncer", &self.debouncer)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PortError;
    use crate::message::REQUEST_HEIGHT_TAG;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Parent {
        top_level: bool,
        refuse: bool,
        posted: Vec<RawMessage>,
    }

    impl ParentPort for Parent {
        fn is_embedded(&self) -> bool {
            !self.top_level
        }

        fn post(&mut self, message: &RawMessage) -> Result<(), PortError> {
            if self.refuse {
                return Err(PortError::AccessDenied("cross-origin".to_owned()));
            }
            self.posted.push(message.clone());
            Ok(())
        }
    }

    struct Probe(f64);

    impl LayoutProbe for Probe {
        fn document_height(&self) -> f64 {
            self.0
        }
    }

    #[derive(Default)]
    struct Timer {
        scheduled: Option<TimerTicket>,
        cancels: u32,
    }

    impl TimerPort for Timer {
        fn schedule(&mut self, ticket: TimerTicket) {
            self.scheduled = Some(ticket);
        }

        fn cancel(&mut self) {
            self.scheduled = None;
            self.cancels += 1;
        }
    }

    fn reporter(parent: Parent, height: f64) -> EmbeddedReporter<Parent, Probe, Timer> {
        EmbeddedReporter::new(
            parent,
            Probe(height),
            Timer::default(),
            MessageCodec::new(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn start_pushes_initial_height() {
        let mut r = reporter(Parent::default(), 1234.0);
        assert_eq!(r.start(), ReportOutcome::Sent { height: 1234 });
        assert_eq!(r.phase(), ReporterPhase::Observing);
        assert_eq!(r.parent().posted.len(), 1);
    }

    #[test]
    fn top_level_context_never_posts() {
        let mut r = reporter(
            Parent {
                top_level: true,
                ..Parent::default()
            },
            900.0,
        );
        assert_eq!(
            r.start(),
            ReportOutcome::Skipped(ReportSkipReason::NotEmbedded)
        );
        assert!(r.parent().posted.is_empty());
    }

    #[test]
    fn refused_post_is_swallowed_and_counted() {
        let mut r = reporter(
            Parent {
                refuse: true,
                ..Parent::default()
            },
            900.0,
        );
        assert_eq!(r.start(), ReportOutcome::Dropped);
        assert_eq!(r.stats().dropped, 1);
        assert_eq!(r.stats().sent, 0);
    }

    #[test]
    fn zero_height_is_not_reported() {
        let mut r = reporter(Parent::default(), 0.0);
        assert_eq!(
            r.start(),
            ReportOutcome::Skipped(ReportSkipReason::NoMeasurement)
        );
    }

    #[test]
    fn triggers_before_start_are_ignored() {
        let mut r = reporter(Parent::default(), 900.0);
        assert_eq!(r.on_trigger(ReportTrigger::Layout), TriggerResponse::Ignored);
        assert_eq!(r.on_trigger(ReportTrigger::Mutation), TriggerResponse::Ignored);
        assert!(r.timer().scheduled.is_none());
    }

    #[test]
    fn layout_and_resize_report_immediately() {
        let mut r = reporter(Parent::default(), 900.0);
        r.start();
        for trigger in [ReportTrigger::Layout, ReportTrigger::ViewportResize] {
            assert_eq!(
                r.on_trigger(trigger),
                TriggerResponse::Reported(ReportOutcome::Sent { height: 900 })
            );
        }
        assert_eq!(r.stats().sent, 3);
    }

    #[test]
    fn mutation_burst_schedules_latest_ticket_only() {
        let mut r = reporter(Parent::default(), 900.0);
        r.start();
        for _ in 0..5 {
            r.on_trigger(ReportTrigger::Mutation);
        }
        let ticket = r.timer().scheduled.expect("ticket scheduled");
        assert_eq!(r.stats().coalesced, 4);
        assert_eq!(
            r.on_timer(ticket.generation),
            TriggerResponse::Reported(ReportOutcome::Sent { height: 900 })
        );
        assert_eq!(r.on_timer(ticket.generation), TriggerResponse::Ignored);
        assert_eq!(r.stats().sent, 2);
    }

    #[test]
    fn request_height_answers_even_right_after_a_report() {
        let mut r = reporter(Parent::default(), 777.0);
        r.start();
        let request = RawMessage::tagged(REQUEST_HEIGHT_TAG);
        assert_eq!(
            r.on_message(&request),
            TriggerResponse::Reported(ReportOutcome::Sent { height: 777 })
        );
        assert_eq!(r.stats().requests, 1);
        assert_eq!(r.parent().posted.len(), 2);
    }

    #[test]
    fn inbound_resize_and_noise_are_ignored() {
        let mut r = reporter(Parent::default(), 777.0);
        r.start();
        let resize = RawMessage::tagged("resize").with_height(10);
        assert_eq!(r.on_message(&resize), TriggerResponse::Ignored);
        assert_eq!(r.on_message(&RawMessage::default()), TriggerResponse::Ignored);
    }

    #[test]
    fn teardown_cancels_pending_timer_and_blocks_reports() {
        let mut r = reporter(Parent::default(), 900.0);
        r.start();
        let TriggerResponse::Deferred(ticket) = r.on_trigger(ReportTrigger::Mutation) else {
            panic!("mutation should defer");
        };
        assert!(r.teardown());
        assert!(!r.teardown());
        assert_eq!(r.timer().cancels, 1);
        assert!(r.timer().scheduled.is_none());
        assert_eq!(r.on_timer(ticket.generation), TriggerResponse::Ignored);
        assert_eq!(r.on_trigger(ReportTrigger::Mutation), TriggerResponse::Ignored);
        assert_eq!(
            r.report_now(),
            ReportOutcome::Skipped(ReportSkipReason::NotObserving)
        );
        assert_eq!(r.start(), ReportOutcome::Skipped(ReportSkipReason::NotObserving));
        assert_eq!(r.parent().posted.len(), 1);
    }
}
