//! Non-blocking indicator animation driven by the confirmed charge state.
//!
//! The engine never sleeps: each tick reports the output intensity plus the
//! delay until the next tick, and the owning task schedules itself. Static
//! programs (off, solid) report no next wake at all, so a paused engine costs
//! nothing until the state changes again.

use core::time::Duration;

use crate::state::ChargeState;

/// Brightness steps in each half of the breathing cycle.
pub const BREATH_STEPS: usize = 8;

/// Rising half of the breathing ramp; the falling half mirrors it.
const BREATH_CURVE: [u8; BREATH_STEPS] = [0, 9, 26, 55, 98, 152, 208, 255];

/// Default delay between breathing steps.
pub const DEFAULT_BREATH_STEP: Duration = Duration::from_millis(120);

/// Default full on/off period of the fault blink pattern.
pub const DEFAULT_FAULT_BLINK: Duration = Duration::from_millis(400);

/// Full output intensity.
pub const MAX_INTENSITY: u8 = u8::MAX;

/// Animation program for the indicator output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorProgram {
    /// Output held dark.
    Off,
    /// Output held at full intensity.
    SolidOn,
    /// On/off square wave with the given full period (50% duty).
    Blinking(Duration),
    /// Breathing ramp with the given per-step delay.
    Breathing(Duration),
}

/// Pure mapping from confirmed state to the program the indicator should run.
///
/// The fault blink is deliberately distinct from both the charging breathe
/// and the settled dark output.
pub const fn program_for(state: ChargeState) -> IndicatorProgram {
    match state {
        ChargeState::Charging => IndicatorProgram::Breathing(DEFAULT_BREATH_STEP),
        ChargeState::NotCharging => IndicatorProgram::Off,
        ChargeState::Fault => IndicatorProgram::Blinking(DEFAULT_FAULT_BLINK),
    }
}

/// One animation frame: the intensity to output now and the delay until the
/// next tick (`None` for static programs).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndicatorFrame {
    pub intensity: u8,
    pub next_wake: Option<Duration>,
}

/// Animation state machine owned exclusively by the indicator task.
#[derive(Clone, Debug)]
pub struct IndicatorEngine {
    program: IndicatorProgram,
    phase: usize,
}

impl IndicatorEngine {
    /// Creates an engine holding the output dark.
    pub const fn new() -> Self {
        Self {
            program: IndicatorProgram::Off,
            phase: 0,
        }
    }

    /// Returns the program currently running.
    pub const fn program(&self) -> IndicatorProgram {
        self.program
    }

    /// Switches programs, forcing the output to the new program's initial
    /// frame. Re-applying the running program does not reset the phase.
    pub fn set_program(&mut self, program: IndicatorProgram) -> IndicatorFrame {
        if program != self.program {
            self.program = program;
            self.phase = 0;
        }
        self.frame()
    }

    /// Convenience wrapper over [`program_for`] + [`Self::set_program`].
    pub fn apply_state(&mut self, state: ChargeState) -> IndicatorFrame {
        self.set_program(program_for(state))
    }

    /// Advances the animation one step and returns the frame to output.
    pub fn tick(&mut self) -> IndicatorFrame {
        match self.program {
            IndicatorProgram::Off | IndicatorProgram::SolidOn => {}
            IndicatorProgram::Blinking(_) => self.phase = (self.phase + 1) % 2,
            IndicatorProgram::Breathing(_) => {
                self.phase = (self.phase + 1) % (2 * BREATH_STEPS);
            }
        }
        self.frame()
    }

    fn frame(&self) -> IndicatorFrame {
        match self.program {
            IndicatorProgram::Off => IndicatorFrame {
                intensity: 0,
                next_wake: None,
            },
            IndicatorProgram::SolidOn => IndicatorFrame {
                intensity: MAX_INTENSITY,
                next_wake: None,
            },
            IndicatorProgram::Blinking(period) => IndicatorFrame {
                intensity: if self.phase == 0 { MAX_INTENSITY } else { 0 },
                next_wake: Some(period / 2),
            },
            IndicatorProgram::Breathing(step) => IndicatorFrame {
                intensity: breath_intensity(self.phase),
                next_wake: Some(step),
            },
        }
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn breath_intensity(phase: usize) -> u8 {
    if phase < BREATH_STEPS {
        BREATH_CURVE[phase]
    } else {
        BREATH_CURVE[2 * BREATH_STEPS - 1 - phase]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_mapping_is_fixed() {
        assert_eq!(
            program_for(ChargeState::Charging),
            IndicatorProgram::Breathing(DEFAULT_BREATH_STEP)
        );
        assert_eq!(program_for(ChargeState::NotCharging), IndicatorProgram::Off);
        assert_eq!(
            program_for(ChargeState::Fault),
            IndicatorProgram::Blinking(DEFAULT_FAULT_BLINK)
        );
    }

    #[test]
    fn static_programs_report_no_next_wake() {
        let mut engine = IndicatorEngine::new();

        let frame = engine.set_program(IndicatorProgram::Off);
        assert_eq!(frame.intensity, 0);
        assert_eq!(frame.next_wake, None);

        let frame = engine.set_program(IndicatorProgram::SolidOn);
        assert_eq!(frame.intensity, MAX_INTENSITY);
        assert_eq!(frame.next_wake, None);
    }

    #[test]
    fn blink_alternates_at_half_period() {
        let mut engine = IndicatorEngine::new();
        let period = Duration::from_millis(400);

        let frame = engine.set_program(IndicatorProgram::Blinking(period));
        assert_eq!(frame.intensity, MAX_INTENSITY);
        assert_eq!(frame.next_wake, Some(Duration::from_millis(200)));

        assert_eq!(engine.tick().intensity, 0);
        assert_eq!(engine.tick().intensity, MAX_INTENSITY);
    }

    #[test]
    fn breathing_ramps_up_then_down() {
        let mut engine = IndicatorEngine::new();
        engine.set_program(IndicatorProgram::Breathing(Duration::from_millis(120)));

        let mut previous = 0;
        for _ in 1..BREATH_STEPS {
            let frame = engine.tick();
            assert!(frame.intensity > previous, "rising half must be monotonic");
            previous = frame.intensity;
        }
        assert_eq!(previous, MAX_INTENSITY);

        let frame = engine.tick();
        assert_eq!(frame.intensity, MAX_INTENSITY, "peak holds one extra step");
        let frame = engine.tick();
        assert!(frame.intensity < MAX_INTENSITY, "falling half must descend");
    }

    #[test]
    fn program_switch_forces_initial_frame() {
        let mut engine = IndicatorEngine::new();
        engine.set_program(IndicatorProgram::Breathing(DEFAULT_BREATH_STEP));
        engine.tick();
        engine.tick();

        // Pause (state settles) and resume: no carry-over phase.
        let frame = engine.apply_state(ChargeState::NotCharging);
        assert_eq!(frame.intensity, 0);
        let frame = engine.apply_state(ChargeState::Charging);
        assert_eq!(frame.intensity, BREATH_CURVE[0]);
    }

    #[test]
    fn reapplying_running_program_keeps_phase() {
        let mut engine = IndicatorEngine::new();
        engine.apply_state(ChargeState::Charging);
        let advanced = engine.tick();
        let unchanged = engine.apply_state(ChargeState::Charging);
        assert_eq!(unchanged.intensity, advanced.intensity);
    }
}
