#![forbid(unsafe_code)]

//! Trailing-edge debounce as an explicit state machine.
//!
//! `Idle -> Pending(ticket) -> Idle`. A trigger while `Pending` re-arms the
//! timer under a fresh generation instead of queueing a second action, so a
//! burst of triggers yields exactly one fire once the burst goes quiet.
//!
//! The debouncer never owns a timer. It hands out [`TimerTicket`]s for the
//! host to schedule and only honours the generation it issued last, which
//! makes a late callback from a superseded timer harmless.

use core::time::Duration;

/// One request to schedule a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket {
    /// Identifies this arming; only the latest generation may fire.
    pub generation: u64,
    /// Delay from now until the timer should fire.
    pub after: Duration,
}

/// Observable debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceState {
    #[default]
    Idle,
    Pending {
        generation: u64,
        /// Triggers folded into this pending fire (at least 1).
        coalesced: u32,
    },
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: DebounceState,
    next_generation: u64,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: DebounceState::Idle,
            next_generation: 1,
        }
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub const fn state(&self) -> DebounceState {
        self.state
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, DebounceState::Pending { .. })
    }

    /// Register a trigger and return the ticket the host must (re)schedule.
    pub fn trigger(&mut self) -> TimerTicket {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let coalesced = match self.state {
            DebounceState::Idle => 1,
            DebounceState::Pending { coalesced, .. } => coalesced.saturating_add(1),
        };
        self.state = DebounceState::Pending {
            generation,
            coalesced,
        };
        TimerTicket {
            generation,
            after: self.delay,
        }
    }

    /// A scheduled timer elapsed.
    ///
    /// Returns the number of coalesced triggers when `generation` is the live
    /// ticket (and returns to `Idle`), `None` for stale or unexpected fires.
    pub fn fire(&mut self, generation: u64) -> Option<u32> {
        match self.state {
            DebounceState::Pending {
                generation: live,
                coalesced,
            } if live == generation => {
                self.state = DebounceState::Idle;
                Some(coalesced)
            }
            _ => None,
        }
    }

    /// Drop any pending fire. Returns whether something was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.state = DebounceState::Idle;
        was_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> Debouncer {
        Debouncer::new(Duration::from_millis(100))
    }

    #[test]
    fn single_trigger_fires_once() {
        let mut d = debouncer();
        let ticket = d.trigger();
        assert_eq!(ticket.after, Duration::from_millis(100));
        assert_eq!(d.fire(ticket.generation), Some(1));
        assert_eq!(d.state(), DebounceState::Idle);
        assert_eq!(d.fire(ticket.generation), None);
    }

    #[test]
    fn burst_rearms_and_coalesces() {
        let mut d = debouncer();
        let first = d.trigger();
        let second = d.trigger();
        let third = d.trigger();
        assert_ne!(first.generation, third.generation);
        assert_eq!(d.fire(first.generation), None);
        assert_eq!(d.fire(second.generation), None);
        assert!(d.is_pending());
        assert_eq!(d.fire(third.generation), Some(3));
    }

    #[test]
    fn cancel_invalidates_live_ticket() {
        let mut d = debouncer();
        let ticket = d.trigger();
        assert!(d.cancel());
        assert!(!d.cancel());
        assert_eq!(d.fire(ticket.generation), None);
    }

    #[test]
    fn generations_do_not_repeat_after_cancel() {
        let mut d = debouncer();
        let before = d.trigger();
        d.cancel();
        let after = d.trigger();
        assert_ne!(before.generation, after.generation);
        assert_eq!(d.fire(before.generation), None);
        assert_eq!(d.fire(after.generation), Some(1));
    }
}
