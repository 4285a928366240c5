#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Lightweight atomics mirror the monitor task's view of the world so other
//! components can read a consistent [`StatusSnapshot`] without touching the
//! task's state directly.

use core::time::Duration;

use charge_core::mode::AcquisitionMode;
use charge_core::monitor::MonitorStats;
use charge_core::state::ChargeState;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::charge::FirmwareInstant;

/// Confirmed charge state, encoded.
static STATE: AtomicU8 = AtomicU8::new(STATE_NOT_CHARGING);
/// Acquisition mode, encoded.
static MODE: AtomicU8 = AtomicU8::new(MODE_POLLING);
/// Confirmed transitions since boot.
static TRANSITIONS: AtomicU32 = AtomicU32::new(0);
/// Edge interrupts serviced since boot.
static INTERRUPTS: AtomicU32 = AtomicU32::new(0);
/// Timestamp (µs, +1) of the last confirmed transition.
static LAST_CHANGE_MICROS: AtomicU32 = AtomicU32::new(0);
/// Latched flap-fault flag.
static HARDWARE_FAULT: AtomicBool = AtomicBool::new(false);
/// Current consecutive sample-error streak.
static CONSECUTIVE_ERRORS: AtomicU8 = AtomicU8::new(0);
/// Commands rejected because the monitor queue was full.
static DROPPED_COMMANDS: AtomicU32 = AtomicU32::new(0);

const STATE_NOT_CHARGING: u8 = 0;
const STATE_CHARGING: u8 = 1;
const STATE_FAULT: u8 = 2;

const MODE_INTERRUPT: u8 = 0;
const MODE_POLLING: u8 = 1;
const MODE_DEGRADED: u8 = 2;

/// Point-in-time view of the monitor's externally visible state.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub state: ChargeState,
    pub mode: AcquisitionMode,
    pub transitions: u32,
    pub interrupts: u32,
    pub dropped_commands: u32,
    pub consecutive_errors: u8,
    pub hardware_fault: bool,
    /// Time since the last confirmed transition, if one has happened.
    pub last_change_age: Option<Duration>,
}

fn encode_state(state: ChargeState) -> u8 {
    match state {
        ChargeState::NotCharging => STATE_NOT_CHARGING,
        ChargeState::Charging => STATE_CHARGING,
        ChargeState::Fault => STATE_FAULT,
    }
}

fn decode_state(raw: u8) -> ChargeState {
    match raw {
        STATE_CHARGING => ChargeState::Charging,
        STATE_FAULT => ChargeState::Fault,
        _ => ChargeState::NotCharging,
    }
}

fn encode_mode(mode: AcquisitionMode) -> u8 {
    match mode {
        AcquisitionMode::Interrupt => MODE_INTERRUPT,
        AcquisitionMode::Polling => MODE_POLLING,
        AcquisitionMode::Degraded => MODE_DEGRADED,
    }
}

fn decode_mode(raw: u8) -> AcquisitionMode {
    match raw {
        MODE_INTERRUPT => AcquisitionMode::Interrupt,
        MODE_DEGRADED => AcquisitionMode::Degraded,
        _ => AcquisitionMode::Polling,
    }
}

fn encode_micros(micros: u32) -> u32 {
    micros.wrapping_add(1)
}

fn decode_micros(raw: u32) -> Option<u32> {
    if raw == 0 { None } else { Some(raw.wrapping_sub(1)) }
}

fn micros_from_instant(instant: FirmwareInstant) -> u32 {
    let micros = instant.into_embassy().as_micros();
    if micros >= u64::from(u32::MAX) {
        u32::MAX - 1
    } else {
        micros as u32
    }
}

fn duration_since(now: FirmwareInstant, raw: u32) -> Option<Duration> {
    let stored = decode_micros(raw)?;
    let now_micros = micros_from_instant(now);
    let delta = now_micros.wrapping_sub(stored);
    Some(Duration::from_micros(u64::from(delta)))
}

/// Records a confirmed transition and its timestamp.
pub fn record_confirmed(state: ChargeState, timestamp: FirmwareInstant) {
    STATE.store(encode_state(state), Ordering::Relaxed);
    let micros = micros_from_instant(timestamp);
    LAST_CHANGE_MICROS.store(encode_micros(micros), Ordering::Relaxed);
}

/// Mirrors the monitor's counters after a sample was processed.
pub fn record_stats(stats: &MonitorStats<FirmwareInstant>) {
    MODE.store(encode_mode(stats.mode), Ordering::Relaxed);
    TRANSITIONS.store(stats.transitions, Ordering::Relaxed);
    INTERRUPTS.store(stats.interrupts, Ordering::Relaxed);
    HARDWARE_FAULT.store(stats.hardware_fault, Ordering::Relaxed);
    CONSECUTIVE_ERRORS.store(stats.consecutive_errors, Ordering::Relaxed);
}

/// Counts a command rejected because the monitor queue was full.
#[allow(dead_code)]
pub fn record_dropped_command() {
    DROPPED_COMMANDS.fetch_add(1, Ordering::Relaxed);
}

/// Returns the dropped-command count on its own.
#[allow(dead_code)]
pub fn snapshot_dropped_commands() -> u32 {
    DROPPED_COMMANDS.load(Ordering::Relaxed)
}

/// Builds a [`StatusSnapshot`] from the stored metrics.
pub fn snapshot(now: FirmwareInstant) -> StatusSnapshot {
    StatusSnapshot {
        state: decode_state(STATE.load(Ordering::Relaxed)),
        mode: decode_mode(MODE.load(Ordering::Relaxed)),
        transitions: TRANSITIONS.load(Ordering::Relaxed),
        interrupts: INTERRUPTS.load(Ordering::Relaxed),
        dropped_commands: DROPPED_COMMANDS.load(Ordering::Relaxed),
        consecutive_errors: CONSECUTIVE_ERRORS.load(Ordering::Relaxed),
        hardware_fault: HARDWARE_FAULT.load(Ordering::Relaxed),
        last_change_age: duration_since(now, LAST_CHANGE_MICROS.load(Ordering::Relaxed)),
    }
}
