//! Runaway-transition detection for the charge line.
//!
//! A charger cannot physically cycle faster than a handful of transitions per
//! minute; a flood of confirmed transitions points at a loose connector or a
//! floating status pin. The detector counts confirmed transitions inside a
//! rolling window and latches a fault once the count exceeds the ceiling.
//! The fault is a diagnostic flag: it never rewrites the confirmed
//! [`crate::state::ChargeState`].

use core::ops::Add;
use core::time::Duration;

/// Default accounting window for transition counting.
pub const DEFAULT_FLAP_WINDOW: Duration = Duration::from_secs(60);

/// Default ceiling of confirmed transitions per window.
pub const DEFAULT_FLAP_CEILING: u32 = 100;

/// Configuration for the flap detector.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlapConfig {
    /// Length of the rolling accounting window.
    pub window: Duration,
    /// Transitions beyond this count within one window latch a fault.
    pub ceiling: u32,
}

impl FlapConfig {
    /// Creates a configuration from explicit window and ceiling.
    pub const fn new(window: Duration, ceiling: u32) -> Self {
        Self { window, ceiling }
    }
}

impl Default for FlapConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FLAP_WINDOW, DEFAULT_FLAP_CEILING)
    }
}

/// Counts confirmed transitions and latches a hardware-fault flag.
#[derive(Clone, Debug)]
pub struct FlapDetector<I> {
    config: FlapConfig,
    window_ends: Option<I>,
    transitions: u32,
    faulted: bool,
}

impl<I> FlapDetector<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a detector with no window open.
    pub const fn new(config: FlapConfig) -> Self {
        Self {
            config,
            window_ends: None,
            transitions: 0,
            faulted: false,
        }
    }

    /// Records one confirmed transition at `now`.
    pub fn record_transition(&mut self, now: I) {
        match self.window_ends {
            Some(ends) if now < ends => {}
            _ => {
                // Window rollover. A latched fault stays visible until
                // maintenance clears it.
                self.window_ends = Some(now + self.config.window);
                self.transitions = 0;
            }
        }

        self.transitions = self.transitions.saturating_add(1);
        if self.transitions > self.config.ceiling {
            self.faulted = true;
        }
    }

    /// Returns `true` while a flap fault is latched.
    pub const fn is_fault(&self) -> bool {
        self.faulted
    }

    /// Returns the transition count inside the current window.
    pub const fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Periodic upkeep: clears the latch and counters once the window has
    /// expired, so a past fault cannot lock the detector up permanently.
    pub fn maintain(&mut self, now: I) {
        if let Some(ends) = self.window_ends
            && now >= ends
        {
            self.window_ends = None;
            self.transitions = 0;
            self.faulted = false;
        }
    }

    /// Explicit reset after the fault has been acknowledged.
    pub fn acknowledge(&mut self) {
        self.window_ends = None;
        self.transitions = 0;
        self.faulted = false;
    }
}
