//! Charge-monitor plumbing shared between firmware tasks and `charge-core`.

use core::ops::Add;

use charge_core::monitor::ChargeMonitor;
use charge_core::notify::Dispatcher;
use charge_core::state::ChargeState;
#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use embassy_sync::signal::Signal;
use embassy_time::{Duration as EmbassyDuration, Instant};

use crate::status;

/// Depth of the command queue shared between producers and the monitor task.
pub const COMMAND_QUEUE_DEPTH: usize = 4;

#[cfg(target_os = "none")]
type ChargeMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type ChargeMutex = CriticalSectionRawMutex;

/// Out-of-band requests accepted by the monitor task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MonitorCommand {
    /// Sample the line now instead of waiting for the next scheduled wake.
    ForceCheck,
    /// Clear a latched flap fault after the operator has seen it.
    AcknowledgeFault,
}

/// Queue carrying [`MonitorCommand`]s into the monitor task.
pub type CommandQueue = Channel<ChargeMutex, MonitorCommand, COMMAND_QUEUE_DEPTH>;

/// Convenience receiver type alias for the monitor command queue.
pub type CommandReceiver<'a> = Receiver<'a, ChargeMutex, MonitorCommand, COMMAND_QUEUE_DEPTH>;

/// Latest-value signal carrying confirmed states to the indicator task.
pub type StateSignal = Signal<ChargeMutex, ChargeState>;

/// Monitor context bound to the firmware's monotonic clock.
pub type Monitor = ChargeMonitor<FirmwareInstant>;

/// Subscriber dispatcher bound to the default capacity.
pub type StateDispatcher = Dispatcher;

/// Command queue feeding the monitor task.
pub static COMMAND_QUEUE: CommandQueue = Channel::new();

/// Confirmed-state signal consumed by the indicator task.
pub static STATE_SIGNAL: StateSignal = Signal::new();

/// Requests an immediate out-of-schedule sample of the charge line.
///
/// Returns `false` when the command queue is full; the drop is counted so a
/// stuck consumer shows up in diagnostics instead of vanishing silently.
#[allow(dead_code)]
pub fn request_force_check() -> bool {
    enqueue(MonitorCommand::ForceCheck)
}

/// Requests that a latched flap fault be cleared.
#[allow(dead_code)]
pub fn acknowledge_fault() -> bool {
    enqueue(MonitorCommand::AcknowledgeFault)
}

#[allow(dead_code)]
fn enqueue(command: MonitorCommand) -> bool {
    if COMMAND_QUEUE.try_send(command).is_ok() {
        true
    } else {
        status::record_dropped_command();
        #[cfg(target_os = "none")]
        defmt::warn!("monitor queue full, command dropped");
        false
    }
}

/// Monotonic timestamp newtype satisfying the instant bound `charge-core`
/// expects (`Ord` plus `Add<core::time::Duration>`).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Captures the current monotonic time.
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Returns the wrapped Embassy instant.
    pub fn into_embassy(self) -> Instant {
        self.0
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl Add<core::time::Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: core::time::Duration) -> Self::Output {
        Self(self.0 + core_duration_to_embassy(rhs))
    }
}

/// Converts a core duration into Embassy's tick-based duration, saturating.
pub fn core_duration_to_embassy(duration: core::time::Duration) -> EmbassyDuration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    EmbassyDuration::from_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instants_order_and_advance() {
        let base = FirmwareInstant::from(Instant::from_micros(1_000));
        let later = base + core::time::Duration::from_millis(5);

        assert!(later > base);
        assert_eq!(later.into_embassy(), Instant::from_micros(6_000));
    }

    #[test]
    fn full_queue_drops_are_counted() {
        let before = status::snapshot_dropped_commands();

        let mut accepted = 0;
        let mut rejected = 0;
        for _ in 0..=COMMAND_QUEUE_DEPTH {
            if request_force_check() {
                accepted += 1;
            } else {
                rejected += 1;
            }
        }

        assert_eq!(accepted, COMMAND_QUEUE_DEPTH);
        assert_eq!(rejected, 1);
        assert_eq!(status::snapshot_dropped_commands(), before + 1);

        // Drain so other tests see an empty queue.
        while COMMAND_QUEUE.try_receive().is_ok() {}
    }
}
