//! Confirmed charge-state monitor.
//!
//! Combines the debounce engine, flap detector, and mode controller behind a
//! single serialized state machine. Raw samples arrive from the edge path or
//! the poll path, but never concurrently: the owning task (or test) is the
//! only writer. The monitor answers two questions per sample — did a
//! confirmed transition happen, and when should the caller wake next.

use core::ops::Add;
use core::time::Duration;

use crate::debounce::{DebounceConfig, DebounceOutcome, Debouncer};
use crate::flap::{FlapConfig, FlapDetector};
use crate::mode::{AcquisitionMode, ModeChange, ModeController, PollPolicy};
use crate::state::{ChargeState, SenseError};

/// Monitor-wide configuration bundle.
#[derive(Copy, Clone, Debug, Default)]
pub struct MonitorConfig {
    pub debounce: DebounceConfig,
    pub flap: FlapConfig,
    pub poll: PollPolicy,
}

/// Where a raw sample originated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleOrigin {
    /// Edge interrupt on the charge line.
    Edge,
    /// Scheduled poll tick (fallback path or interrupt-mode backstop).
    Poll,
    /// Out-of-band request from a higher layer.
    Forced,
}

/// Result of feeding one raw sample through the monitor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SampleOutcome<I> {
    /// Confirmed transition, if the sample completed one.
    pub confirmed: Option<ChargeState>,
    /// Acquisition-mode transition triggered by this sample, if any.
    pub mode_change: Option<ModeChange>,
    /// Pending stability re-check the caller should schedule, if any.
    pub recheck_at: Option<I>,
}

/// Diagnostics snapshot exposed to higher layers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MonitorStats<I> {
    pub last_change: Option<I>,
    pub transitions: u32,
    pub interrupts: u32,
    pub hardware_fault: bool,
    pub consecutive_errors: u8,
    pub mode: AcquisitionMode,
}

/// Owned monitor context; one instance per monitored line.
#[derive(Clone, Debug)]
pub struct ChargeMonitor<I> {
    debouncer: Debouncer<I>,
    flap: FlapDetector<I>,
    mode: ModeController<I>,
    transitions: u32,
    interrupts: u32,
    last_change: Option<I>,
}

impl<I> ChargeMonitor<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a monitor with the given confirmed starting state.
    pub const fn new(config: MonitorConfig, initial: ChargeState) -> Self {
        Self {
            debouncer: Debouncer::new(config.debounce, initial),
            flap: FlapDetector::new(config.flap),
            mode: ModeController::new(config.poll),
            transitions: 0,
            interrupts: 0,
            last_change: None,
        }
    }

    /// Current confirmed charge state.
    pub const fn state(&self) -> ChargeState {
        self.debouncer.confirmed()
    }

    /// Current acquisition mode.
    pub const fn mode(&self) -> AcquisitionMode {
        self.mode.mode()
    }

    /// Returns `true` while the flap detector reports a hardware fault.
    pub const fn hardware_fault(&self) -> bool {
        self.flap.is_fault()
    }

    /// Records the outcome of edge-interrupt configuration at init.
    pub fn interrupt_configured(&mut self, ok: bool) {
        self.mode.interrupt_configured(ok);
    }

    /// Records an edge arrival. Call before sampling the line.
    pub fn record_edge(&mut self, now: I) {
        self.interrupts = self.interrupts.saturating_add(1);
        self.mode.record_activity(now);
    }

    /// Records user/system activity, resetting the idle clock.
    pub fn record_activity(&mut self, now: I) {
        self.mode.record_activity(now);
    }

    /// Feeds one raw sample through debounce, mode, and flap bookkeeping.
    pub fn handle_sample(
        &mut self,
        level: Result<bool, SenseError>,
        origin: SampleOrigin,
        now: I,
    ) -> SampleOutcome<I> {
        if origin == SampleOrigin::Forced {
            self.mode.record_activity(now);
        }

        match level {
            Err(_) => {
                let mode_change = self.mode.record_sample_error();
                // Read failures propagate fast: confirm the fault without
                // waiting out the stability window.
                let confirmed = if self.debouncer.confirm_fault() {
                    self.note_transition(now);
                    Some(ChargeState::Fault)
                } else {
                    None
                };
                SampleOutcome {
                    confirmed,
                    mode_change,
                    recheck_at: None,
                }
            }
            Ok(active) => {
                let mode_change = self.mode.record_sample_ok();
                match self.debouncer.observe_level(active, now) {
                    DebounceOutcome::Confirmed(state) => {
                        self.note_transition(now);
                        SampleOutcome {
                            confirmed: Some(state),
                            mode_change,
                            recheck_at: None,
                        }
                    }
                    DebounceOutcome::Pending { recheck_at } => SampleOutcome {
                        confirmed: None,
                        mode_change,
                        recheck_at: Some(recheck_at),
                    },
                    DebounceOutcome::Settled => SampleOutcome {
                        confirmed: None,
                        mode_change,
                        recheck_at: None,
                    },
                }
            }
        }
    }

    /// Periodic upkeep driven by the poll tick.
    pub fn maintain(&mut self, now: I) {
        self.flap.maintain(now);
    }

    /// Clears the flap fault after it has been acknowledged.
    pub fn acknowledge_fault(&mut self) {
        self.flap.acknowledge();
    }

    /// Next instant the owning task should wake: the pending stability
    /// re-check if one is due before the regular poll, else the poll.
    pub fn next_wake(&self, now: I) -> I {
        let poll_at = now + self.mode.poll_interval(self.state(), now);
        match self.debouncer.recheck_at() {
            Some(recheck) if recheck < poll_at => recheck,
            _ => poll_at,
        }
    }

    /// Diagnostics snapshot.
    pub fn stats(&self) -> MonitorStats<I> {
        MonitorStats {
            last_change: self.last_change,
            transitions: self.transitions,
            interrupts: self.interrupts,
            hardware_fault: self.flap.is_fault(),
            consecutive_errors: self.mode.consecutive_errors(),
            mode: self.mode.mode(),
        }
    }

    fn note_transition(&mut self, now: I) {
        self.transitions = self.transitions.saturating_add(1);
        self.last_change = Some(now);
        self.flap.record_transition(now);
    }
}
