//! Pin-level access to the charger status line and the indicator output.
//!
//! The TP4056 CHRG pin is open-drain and active low: the charger pulls the
//! line low while a charge cycle is in progress, so the input is read with
//! the internal pull-up enabled and `low == charging`.

use charge_core::state::{ChargeSense, SenseError};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::timer::simple_pwm::SimplePwmChannel;

/// Charger status input with edge-interrupt support.
pub struct ChargeLine {
    input: ExtiInput<'static>,
}

impl ChargeLine {
    pub fn new(input: ExtiInput<'static>) -> Self {
        Self { input }
    }

    /// Samples the line, normalized so `true` means a charge in progress.
    pub fn is_charging(&self) -> bool {
        self.input.is_low()
    }

    /// Completes on the next edge in either direction.
    pub async fn wait_for_edge(&mut self) {
        self.input.wait_for_any_edge().await;
    }
}

impl ChargeSense for ChargeLine {
    fn read_level(&mut self) -> Result<bool, SenseError> {
        Ok(self.is_charging())
    }
}

/// PWM-driven indicator LED.
pub struct IndicatorLed {
    channel: SimplePwmChannel<'static, TIM3>,
    max_duty: u16,
}

impl IndicatorLed {
    pub fn new(mut channel: SimplePwmChannel<'static, TIM3>) -> Self {
        let max_duty = channel.max_duty_cycle();
        channel.set_duty_cycle(0);
        channel.enable();
        Self { channel, max_duty }
    }

    /// Scales an 8-bit intensity onto the timer's duty range.
    pub fn set_intensity(&mut self, intensity: u8) {
        let duty = u32::from(self.max_duty) * u32::from(intensity) / u32::from(u8::MAX);
        self.channel
            .set_duty_cycle(u16::try_from(duty).unwrap_or(u16::MAX));
    }
}
