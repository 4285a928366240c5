use core::ops::Add;
use core::time::Duration;

use charge_core::mode::{AcquisitionMode, ModeChange, PollPolicy};
use charge_core::monitor::{ChargeMonitor, MonitorConfig, SampleOrigin};
use charge_core::state::{ChargeState, SenseError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
    }
}

#[test]
fn five_failed_polls_reach_capped_backoff() {
    let config = MonitorConfig {
        poll: PollPolicy {
            max_backoff: Duration::from_secs(60),
            ..PollPolicy::default()
        },
        ..MonitorConfig::default()
    };
    let mut monitor = ChargeMonitor::new(config, ChargeState::NotCharging);
    monitor.record_activity(MockInstant(0));

    let mut degraded_seen = false;
    for i in 0..5_u64 {
        let outcome = monitor.handle_sample(
            Err(SenseError::ReadFailed),
            SampleOrigin::Poll,
            MockInstant(i * 1_000),
        );
        if outcome.mode_change == Some(ModeChange::EnteredDegraded) {
            degraded_seen = true;
        }
    }

    let stats = monitor.stats();
    assert_eq!(stats.consecutive_errors, 5);
    assert!(degraded_seen);
    assert_eq!(stats.mode, AcquisitionMode::Degraded);

    // Streak of 5 scales the 30s base to 90s; the 60s cap wins.
    let now = MockInstant(5_000);
    assert_eq!(monitor.next_wake(now), now + Duration::from_secs(60));
}

#[test]
fn interrupt_mode_error_downgrades_and_cancels_the_backstop_schedule() {
    let mut monitor =
        ChargeMonitor::<MockInstant>::new(MonitorConfig::default(), ChargeState::Charging);
    monitor.interrupt_configured(true);
    monitor.record_activity(MockInstant(0));

    // Interrupt mode: 30s backstop poll despite the charging state.
    assert_eq!(
        monitor.next_wake(MockInstant(0)),
        MockInstant(0) + Duration::from_secs(30)
    );

    let outcome = monitor.handle_sample(
        Err(SenseError::ReadFailed),
        SampleOrigin::Poll,
        MockInstant(100),
    );
    assert_eq!(outcome.mode_change, Some(ModeChange::FellBackToPolling));
    assert_eq!(monitor.mode(), AcquisitionMode::Polling);
    // The read failure confirmed a fault, so the next wake follows the
    // polling error cadence rather than the stale interrupt backstop.
    assert_eq!(monitor.state(), ChargeState::Fault);
    assert_eq!(
        monitor.next_wake(MockInstant(100)),
        MockInstant(100) + Duration::from_secs(30)
    );
}

#[test]
fn successful_sample_recovers_from_degraded() {
    let mut monitor =
        ChargeMonitor::<MockInstant>::new(MonitorConfig::default(), ChargeState::NotCharging);

    for i in 0..5_u64 {
        monitor.handle_sample(Err(SenseError::ReadFailed), SampleOrigin::Poll, MockInstant(i));
    }
    assert_eq!(monitor.mode(), AcquisitionMode::Degraded);

    let outcome = monitor.handle_sample(Ok(false), SampleOrigin::Poll, MockInstant(10));
    assert_eq!(outcome.mode_change, Some(ModeChange::RecoveredToPolling));
    assert_eq!(monitor.mode(), AcquisitionMode::Polling);
    assert_eq!(monitor.stats().consecutive_errors, 0);
}
