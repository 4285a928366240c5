use charge_core::mode::ModeChange;
use charge_core::monitor::SampleOrigin;
use charge_core::state::ChargeSense;
use embassy_futures::select::{Either3, select3};
use embassy_time::Timer;

use crate::charge::{CommandReceiver, FirmwareInstant, Monitor, MonitorCommand, StateDispatcher, StateSignal};
use crate::hw::ChargeLine;
use crate::status;

/// Single owner of the charge line: edge waits, command handling, and the
/// poll/backstop schedule all run through one select loop, so every sample
/// feeds the monitor from exactly one context.
#[embassy_executor::task]
pub async fn run(
    mut line: ChargeLine,
    mut monitor: Monitor,
    mut dispatcher: StateDispatcher,
    commands: CommandReceiver<'static>,
    signal: &'static StateSignal,
) -> ! {
    let mut flap_latched = false;

    loop {
        let now = FirmwareInstant::now();
        let wake = monitor.next_wake(now);

        let event = select3(
            line.wait_for_edge(),
            commands.receive(),
            Timer::at(wake.into_embassy()),
        )
        .await;

        let now = FirmwareInstant::now();
        let origin = match event {
            Either3::First(()) => {
                monitor.record_edge(now);
                SampleOrigin::Edge
            }
            Either3::Second(MonitorCommand::ForceCheck) => SampleOrigin::Forced,
            Either3::Second(MonitorCommand::AcknowledgeFault) => {
                monitor.acknowledge_fault();
                flap_latched = false;
                status::record_stats(&monitor.stats());
                defmt::info!("flap fault acknowledged");
                continue;
            }
            Either3::Third(()) => {
                monitor.maintain(now);
                SampleOrigin::Poll
            }
        };

        let outcome = monitor.handle_sample(line.read_level(), origin, now);

        if origin == SampleOrigin::Edge && outcome.confirmed.is_none() {
            defmt::debug!("edge inside stability window, deferred");
        }

        if let Some(change) = outcome.mode_change {
            match change {
                ModeChange::FellBackToPolling => defmt::warn!("edge path failed, polling"),
                ModeChange::EnteredDegraded => defmt::warn!("sampling degraded, slow retry"),
                ModeChange::RecoveredToPolling => defmt::info!("sampling recovered"),
            }
        }

        if let Some(state) = outcome.confirmed {
            dispatcher.publish(state);
            signal.signal(state);
            status::record_confirmed(state, now);
        }

        status::record_stats(&monitor.stats());

        // Warn once when the fault latches, not on every wake after.
        let flap = monitor.hardware_fault();
        if flap && !flap_latched {
            let snapshot = status::snapshot(now);
            defmt::warn!("line flapping: {} transitions in window", snapshot.transitions);
        }
        flap_latched = flap;
    }
}
