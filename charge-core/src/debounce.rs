//! Stability-window debounce and confirmation for the raw charge line.
//!
//! Raw samples arrive from an edge interrupt or a poll tick; a level only
//! becomes the confirmed [`ChargeState`] after it has been observed
//! continuously for the configured minimum stable time. The engine is a
//! single serialized state machine: callers must feed it from one execution
//! context at a time.

use core::ops::Add;
use core::time::Duration;

use crate::state::ChargeState;

/// Default minimum stable time before a level change is confirmed.
pub const DEFAULT_MIN_STABLE: Duration = Duration::from_millis(100);

/// Configuration for the confirmation window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DebounceConfig {
    /// How long a candidate level must hold before it is confirmed.
    pub min_stable: Duration,
}

impl DebounceConfig {
    /// Creates a configuration with the provided stable time.
    pub const fn new(min_stable: Duration) -> Self {
        Self { min_stable }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_STABLE)
    }
}

/// Outcome of feeding one raw sample through the stability window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DebounceOutcome<I> {
    /// The sample matches the confirmed state; nothing is pending.
    Settled,
    /// A candidate is accumulating stability; re-sample at `recheck_at`.
    Pending { recheck_at: I },
    /// The candidate survived the window; the transition is confirmed.
    Confirmed(ChargeState),
}

#[derive(Copy, Clone, Debug)]
struct Candidate<I> {
    state: ChargeState,
    confirm_at: I,
}

/// Debounce/confirmation engine tracking at most one candidate level.
#[derive(Clone, Debug)]
pub struct Debouncer<I> {
    config: DebounceConfig,
    confirmed: ChargeState,
    candidate: Option<Candidate<I>>,
}

impl<I> Debouncer<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates an engine with the given confirmed starting state.
    pub const fn new(config: DebounceConfig, initial: ChargeState) -> Self {
        Self {
            config,
            confirmed: initial,
            candidate: None,
        }
    }

    /// Returns the current confirmed state.
    pub const fn confirmed(&self) -> ChargeState {
        self.confirmed
    }

    /// Returns the pending re-check instant while a candidate is in flight.
    pub fn recheck_at(&self) -> Option<I> {
        self.candidate.map(|candidate| candidate.confirm_at)
    }

    /// Feeds a normalized raw level into the window.
    pub fn observe_level(&mut self, active: bool, now: I) -> DebounceOutcome<I> {
        self.observe(ChargeState::from_level(active), now)
    }

    /// Confirms a fault immediately, bypassing the stability window.
    ///
    /// Returns `true` when this changed the confirmed state. Recovery from
    /// fault goes back through [`Self::observe_level`] like any transition.
    pub fn confirm_fault(&mut self) -> bool {
        self.candidate = None;
        if self.confirmed.is_fault() {
            false
        } else {
            self.confirmed = ChargeState::Fault;
            true
        }
    }

    fn observe(&mut self, state: ChargeState, now: I) -> DebounceOutcome<I> {
        if state == self.confirmed {
            // A transient returned to the confirmed level; drop the candidate.
            self.candidate = None;
            return DebounceOutcome::Settled;
        }

        match self.candidate {
            Some(candidate) if candidate.state == state => {
                if now >= candidate.confirm_at {
                    self.confirmed = state;
                    self.candidate = None;
                    DebounceOutcome::Confirmed(state)
                } else {
                    DebounceOutcome::Pending {
                        recheck_at: candidate.confirm_at,
                    }
                }
            }
            _ => {
                let confirm_at = now + self.config.min_stable;
                self.candidate = Some(Candidate { state, confirm_at });
                DebounceOutcome::Pending {
                    recheck_at: confirm_at,
                }
            }
        }
    }
}
