//! Acquisition-mode arbitration between edge interrupts and polling.
//!
//! Interrupt mode is the primary, low-latency path; polling is the fallback
//! when interrupt configuration fails or a sample read errors out. The poll
//! interval is a deliberate power/responsiveness trade-off: short while
//! charging (completion detection matters most there), long when settled or
//! idle, and widened with a capped back-off after consecutive read errors.

use core::ops::Add;
use core::time::Duration;

use crate::state::ChargeState;

/// How raw samples are currently acquired.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AcquisitionMode {
    /// Edge-interrupt driven, with a long-period safety poll as backstop.
    Interrupt,
    /// Timer driven, interval derived from [`PollPolicy`].
    Polling,
    /// Repeated failures in both paths; retrying on a slow cadence.
    Degraded,
}

impl AcquisitionMode {
    /// Short uppercase label used in logs and diagnostics.
    pub const fn label(self) -> &'static str {
        match self {
            AcquisitionMode::Interrupt => "INTERRUPT",
            AcquisitionMode::Polling => "POLLING",
            AcquisitionMode::Degraded => "DEGRADED",
        }
    }
}

/// Mode transition surfaced to the caller so it can adjust the edge source.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ModeChange {
    /// The interrupt path failed; the caller must disable the edge source.
    FellBackToPolling,
    /// Polling kept failing; retries continue at the slow back-off cadence.
    EnteredDegraded,
    /// A successful sample recovered the controller out of degraded mode.
    RecoveredToPolling,
}

/// Poll-interval policy constants.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Interval while the confirmed state is Charging.
    pub charging_interval: Duration,
    /// Interval while settled (NotCharging).
    pub settled_interval: Duration,
    /// Base interval for the error back-off.
    pub error_interval: Duration,
    /// Upper bound for the error back-off.
    pub max_backoff: Duration,
    /// Safety-poll interval while in interrupt mode.
    pub backstop_interval: Duration,
    /// No recorded activity for this long counts as idle.
    pub idle_timeout: Duration,
    /// Interval multiplier applied when idle and not charging.
    pub idle_multiplier: u32,
    /// Consecutive sample errors before Polling degrades.
    pub max_consecutive_errors: u8,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            charging_interval: Duration::from_secs(2),
            settled_interval: Duration::from_secs(10),
            error_interval: Duration::from_secs(30),
            max_backoff: Duration::from_secs(120),
            backstop_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            idle_multiplier: 2,
            max_consecutive_errors: 5,
        }
    }
}

/// Tracks the acquisition mode, error streak, and idle state.
#[derive(Clone, Debug)]
pub struct ModeController<I> {
    policy: PollPolicy,
    mode: AcquisitionMode,
    consecutive_errors: u8,
    last_activity: Option<I>,
}

impl<I> ModeController<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a controller in polling mode with no recorded activity.
    pub const fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            mode: AcquisitionMode::Polling,
            consecutive_errors: 0,
            last_activity: None,
        }
    }

    /// Returns the current acquisition mode.
    pub const fn mode(&self) -> AcquisitionMode {
        self.mode
    }

    /// Returns the current consecutive-error streak.
    pub const fn consecutive_errors(&self) -> u8 {
        self.consecutive_errors
    }

    /// Returns the configured policy.
    pub const fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Records whether edge-interrupt configuration succeeded at init.
    ///
    /// A failure is permanent for the session: the controller stays on the
    /// polling path and never re-attempts interrupt configuration.
    pub fn interrupt_configured(&mut self, ok: bool) {
        self.mode = if ok {
            AcquisitionMode::Interrupt
        } else {
            AcquisitionMode::Polling
        };
    }

    /// Records user/system activity, resetting the idle clock.
    pub fn record_activity(&mut self, now: I) {
        self.last_activity = Some(now);
    }

    /// Returns `true` when no activity was recorded within the idle timeout.
    pub fn is_idle(&self, now: I) -> bool {
        match self.last_activity {
            Some(at) => now >= at + self.policy.idle_timeout,
            None => false,
        }
    }

    /// Records a successful sample read.
    pub fn record_sample_ok(&mut self) -> Option<ModeChange> {
        self.consecutive_errors = 0;
        if self.mode == AcquisitionMode::Degraded {
            self.mode = AcquisitionMode::Polling;
            Some(ModeChange::RecoveredToPolling)
        } else {
            None
        }
    }

    /// Records a failed sample read and applies the fallback rules.
    pub fn record_sample_error(&mut self) -> Option<ModeChange> {
        if self.consecutive_errors < self.policy.max_consecutive_errors {
            self.consecutive_errors += 1;
        }

        match self.mode {
            AcquisitionMode::Interrupt => {
                self.mode = AcquisitionMode::Polling;
                Some(ModeChange::FellBackToPolling)
            }
            AcquisitionMode::Polling
                if self.consecutive_errors >= self.policy.max_consecutive_errors =>
            {
                self.mode = AcquisitionMode::Degraded;
                Some(ModeChange::EnteredDegraded)
            }
            _ => None,
        }
    }

    /// Computes the interval until the next scheduled sample.
    pub fn poll_interval(&self, state: ChargeState, now: I) -> Duration {
        let base = match self.mode {
            AcquisitionMode::Interrupt => self.policy.backstop_interval,
            AcquisitionMode::Degraded => self.backoff(),
            AcquisitionMode::Polling => match state {
                ChargeState::Charging => self.policy.charging_interval,
                ChargeState::NotCharging => self.policy.settled_interval,
                ChargeState::Fault => self.backoff(),
            },
        };

        if self.is_idle(now) && state != ChargeState::Charging {
            base * self.policy.idle_multiplier
        } else {
            base
        }
    }

    fn backoff(&self) -> Duration {
        let scale = 1 + u32::from(self.consecutive_errors) / 2;
        (self.policy.error_interval * scale).min(self.policy.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct MockInstant(u64);

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
        }
    }

    fn controller() -> ModeController<MockInstant> {
        ModeController::new(PollPolicy::default())
    }

    #[test]
    fn interrupt_mode_uses_backstop_interval() {
        let mut ctrl = controller();
        ctrl.interrupt_configured(true);
        ctrl.record_activity(MockInstant(0));

        assert_eq!(ctrl.mode(), AcquisitionMode::Interrupt);
        assert_eq!(
            ctrl.poll_interval(ChargeState::Charging, MockInstant(0)),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn polling_intervals_track_charge_state() {
        let mut ctrl = controller();
        ctrl.record_activity(MockInstant(0));

        assert_eq!(
            ctrl.poll_interval(ChargeState::Charging, MockInstant(0)),
            Duration::from_secs(2)
        );
        assert_eq!(
            ctrl.poll_interval(ChargeState::NotCharging, MockInstant(0)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn idle_multiplier_skips_charging_state() {
        let mut ctrl = controller();
        ctrl.record_activity(MockInstant(0));
        let idle_at = MockInstant(31_000);

        assert!(ctrl.is_idle(idle_at));
        assert_eq!(
            ctrl.poll_interval(ChargeState::NotCharging, idle_at),
            Duration::from_secs(20)
        );
        // Charging keeps the fast cadence even when idle.
        assert_eq!(
            ctrl.poll_interval(ChargeState::Charging, idle_at),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn interrupt_error_falls_back_to_polling() {
        let mut ctrl = controller();
        ctrl.interrupt_configured(true);

        assert_eq!(
            ctrl.record_sample_error(),
            Some(ModeChange::FellBackToPolling)
        );
        assert_eq!(ctrl.mode(), AcquisitionMode::Polling);
    }

    #[test]
    fn repeated_polling_errors_degrade_then_recover() {
        let mut ctrl = controller();

        for _ in 0..4 {
            assert_eq!(ctrl.record_sample_error(), None);
        }
        assert_eq!(ctrl.record_sample_error(), Some(ModeChange::EnteredDegraded));
        assert_eq!(ctrl.mode(), AcquisitionMode::Degraded);
        assert_eq!(ctrl.consecutive_errors(), 5);

        assert_eq!(
            ctrl.record_sample_ok(),
            Some(ModeChange::RecoveredToPolling)
        );
        assert_eq!(ctrl.mode(), AcquisitionMode::Polling);
        assert_eq!(ctrl.consecutive_errors(), 0);
    }

    #[test]
    fn error_backoff_scales_and_caps() {
        let mut ctrl = controller();

        ctrl.record_sample_error();
        ctrl.record_sample_error();
        // Two errors: 30s * (1 + 2/2) = 60s.
        assert_eq!(
            ctrl.poll_interval(ChargeState::Fault, MockInstant(0)),
            Duration::from_secs(60)
        );

        for _ in 0..10 {
            ctrl.record_sample_error();
        }
        // Streak is capped at 5, so the scaled value is 90s, under the cap.
        assert_eq!(ctrl.consecutive_errors(), 5);
        assert_eq!(
            ctrl.poll_interval(ChargeState::Fault, MockInstant(0)),
            Duration::from_secs(90)
        );

        let mut tight = ModeController::<MockInstant>::new(PollPolicy {
            max_backoff: Duration::from_secs(45),
            ..PollPolicy::default()
        });
        for _ in 0..5 {
            tight.record_sample_error();
        }
        assert_eq!(
            tight.poll_interval(ChargeState::Fault, MockInstant(0)),
            Duration::from_secs(45)
        );
    }
}
