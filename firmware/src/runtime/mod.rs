use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{OutputType, Pull};
use embassy_stm32::time::khz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};

use charge_core::monitor::MonitorConfig;
use charge_core::state::ChargeState;

use crate::charge::{self, FirmwareInstant, Monitor};
use crate::hw::{ChargeLine, IndicatorLed};
use crate::status;

mod charge_task;
mod indicator_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

fn log_confirmed(state: ChargeState) {
    defmt::info!("charge state: {}", state.label());
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        EXTI0,
        PA6,
        TIM3,
        ..
    } = hal::init(config);

    // CHRG sense line: open-drain output on the charger side, so pull up and
    // treat low as charging.
    let line = ChargeLine::new(ExtiInput::new(PA0, EXTI0, Pull::Up));
    let initial = if line.is_charging() {
        ChargeState::Charging
    } else {
        ChargeState::NotCharging
    };

    let pwm = SimplePwm::new(
        TIM3,
        Some(PwmPin::new_ch1(PA6, OutputType::PushPull)),
        None,
        None,
        None,
        khz(1),
        Default::default(),
    );
    let led = IndicatorLed::new(pwm.split().ch1);

    let mut monitor = Monitor::new(MonitorConfig::default(), initial);
    monitor.interrupt_configured(true);
    let now = FirmwareInstant::now();
    monitor.record_activity(now);
    status::record_confirmed(initial, now);
    status::record_stats(&monitor.stats());

    let mut dispatcher = charge::StateDispatcher::new(initial);
    if dispatcher.register(log_confirmed).is_err() {
        defmt::warn!("subscriber list full");
    }

    charge::STATE_SIGNAL.signal(initial);

    spawner
        .spawn(charge_task::run(
            line,
            monitor,
            dispatcher,
            charge::COMMAND_QUEUE.receiver(),
            &charge::STATE_SIGNAL,
        ))
        .expect("failed to spawn charge monitor task");
    spawner
        .spawn(indicator_task::run(led, &charge::STATE_SIGNAL))
        .expect("failed to spawn indicator task");

    core::future::pending::<()>().await;
}
