use charge_core::indicator::IndicatorEngine;
use embassy_futures::select::{Either, select};
use embassy_time::Timer;

use crate::charge::{StateSignal, core_duration_to_embassy};
use crate::hw::IndicatorLed;

/// Drives the indicator LED from confirmed states. Animated programs wake on
/// their own cadence; static programs sleep until the next state arrives.
#[embassy_executor::task]
pub async fn run(mut led: IndicatorLed, signal: &'static StateSignal) -> ! {
    let mut engine = IndicatorEngine::new();
    let mut frame = engine.apply_state(signal.wait().await);

    loop {
        led.set_intensity(frame.intensity);

        frame = match frame.next_wake {
            None => engine.apply_state(signal.wait().await),
            Some(delay) => {
                match select(signal.wait(), Timer::after(core_duration_to_embassy(delay))).await {
                    Either::First(state) => engine.apply_state(state),
                    Either::Second(()) => engine.tick(),
                }
            }
        };
    }
}
