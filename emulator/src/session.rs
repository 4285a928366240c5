use std::ops::Add;
use std::time::Duration;

use charge_core::indicator::{IndicatorEngine, IndicatorProgram};
use charge_core::mode::ModeChange;
use charge_core::monitor::{ChargeMonitor, MonitorConfig, SampleOutcome, SampleOrigin};
use charge_core::state::{ChargeSense, ChargeState, SenseError};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("plug", "plug                      - drive the charge line active (edge)"),
    ("unplug", "unplug                    - release the charge line (edge)"),
    ("error", "error <on|off>            - make line reads fail or succeed"),
    ("advance", "advance <ms>              - run the virtual clock forward"),
    ("force", "force                     - request an immediate sample"),
    ("ack", "ack                       - acknowledge a latched flap fault"),
    ("status", "status                    - display monitor and LED state"),
    ("help", "help [topic]              - show help for a command"),
];

/// Millisecond-resolution virtual clock instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct EmuInstant(u64);

impl Add<Duration> for EmuInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Simulated charge line with a switchable read-failure mode.
struct SimLine {
    charging: bool,
    failing: bool,
}

impl ChargeSense for SimLine {
    fn read_level(&mut self) -> Result<bool, SenseError> {
        if self.failing {
            Err(SenseError::ReadFailed)
        } else {
            Ok(self.charging)
        }
    }
}

pub struct Session {
    line: SimLine,
    monitor: ChargeMonitor<EmuInstant>,
    engine: IndicatorEngine,
    indicator_wake: Option<EmuInstant>,
    intensity: u8,
    now_ms: u64,
    flap_reported: bool,
}

impl Session {
    pub fn new() -> Self {
        let mut monitor = ChargeMonitor::new(MonitorConfig::default(), ChargeState::NotCharging);
        monitor.record_activity(EmuInstant(0));

        let mut engine = IndicatorEngine::new();
        let frame = engine.apply_state(ChargeState::NotCharging);

        Self {
            line: SimLine {
                charging: false,
                failing: false,
            },
            monitor,
            engine,
            indicator_wake: frame.next_wake.map(|delay| EmuInstant(0) + delay),
            intensity: frame.intensity,
            now_ms: 0,
            flap_reported: false,
        }
    }

    pub fn handle_command(&mut self, input: &str) -> Vec<String> {
        let mut parts = input.split_whitespace();
        let Some(command) = parts.next() else {
            return Vec::new();
        };
        let argument = parts.next();

        if parts.next().is_some() {
            return vec![format!("ERR trailing input after `{command}`")];
        }

        match (command.to_ascii_lowercase().as_str(), argument) {
            ("plug", None) => self.set_line(true),
            ("unplug", None) => self.set_line(false),
            ("error", Some("on")) => {
                self.line.failing = true;
                vec!["OK line reads will fail".to_string()]
            }
            ("error", Some("off")) => {
                self.line.failing = false;
                vec!["OK line reads restored".to_string()]
            }
            ("advance", Some(raw)) => match raw.parse::<u64>() {
                Ok(ms) => self.advance(ms),
                Err(_) => vec![format!("ERR expected milliseconds, got `{raw}`")],
            },
            ("force", None) => self.force_check(),
            ("ack", None) => {
                self.monitor.acknowledge_fault();
                self.flap_reported = false;
                vec!["OK flap fault cleared".to_string()]
            }
            ("status", None) => self.status(),
            ("help", topic) => help(topic),
            _ => vec![format!("ERR unknown command `{input}` (try `help`)")],
        }
    }

    /// Flips the simulated line level and delivers the resulting edge.
    fn set_line(&mut self, charging: bool) -> Vec<String> {
        let mut out = Vec::new();
        if self.line.charging == charging {
            out.push("OK line level unchanged".to_string());
            return out;
        }

        self.line.charging = charging;
        let now = EmuInstant(self.now_ms);
        self.monitor.record_edge(now);
        let sample = self.line.read_level();
        let outcome = self.monitor.handle_sample(sample, SampleOrigin::Edge, now);
        self.apply_outcome(&outcome, &mut out);

        if let Some(recheck) = outcome.recheck_at {
            out.push(format!(
                "OK edge at t={}ms, stability check at t={}ms",
                self.now_ms, recheck.0
            ));
        } else {
            out.push(format!("OK edge at t={}ms", self.now_ms));
        }
        out
    }

    fn force_check(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        let now = EmuInstant(self.now_ms);
        let sample = self.line.read_level();
        let outcome = self.monitor.handle_sample(sample, SampleOrigin::Forced, now);
        self.apply_outcome(&outcome, &mut out);
        out.push(format!("OK sampled at t={}ms", self.now_ms));
        out
    }

    /// Runs the virtual clock forward, firing monitor wakes and indicator
    /// ticks in timestamp order.
    fn advance(&mut self, ms: u64) -> Vec<String> {
        let mut out = Vec::new();
        let target = self.now_ms + ms;

        loop {
            let monitor_wake = self.monitor.next_wake(EmuInstant(self.now_ms)).0;
            let due = match self.indicator_wake {
                Some(wake) => monitor_wake.min(wake.0),
                None => monitor_wake,
            };
            if due > target {
                break;
            }

            self.now_ms = due.max(self.now_ms);
            let now = EmuInstant(self.now_ms);

            if self.indicator_wake == Some(now) {
                let frame = self.engine.tick();
                self.intensity = frame.intensity;
                self.indicator_wake = frame.next_wake.map(|delay| now + delay);
            }

            if due == monitor_wake {
                self.monitor.maintain(now);
                let sample = self.line.read_level();
                let outcome = self.monitor.handle_sample(sample, SampleOrigin::Poll, now);
                self.apply_outcome(&outcome, &mut out);
            }
        }

        self.now_ms = target;
        out.push(format!("OK clock at t={}ms", self.now_ms));
        out
    }

    fn apply_outcome(&mut self, outcome: &SampleOutcome<EmuInstant>, out: &mut Vec<String>) {
        if let Some(change) = outcome.mode_change {
            let message = match change {
                ModeChange::FellBackToPolling => "mode: edge path failed, now POLLING",
                ModeChange::EnteredDegraded => "mode: entered DEGRADED, slow retries",
                ModeChange::RecoveredToPolling => "mode: recovered to POLLING",
            };
            out.push(message.to_string());
        }

        if let Some(state) = outcome.confirmed {
            out.push(format!(
                "t={}ms confirmed {} (led {})",
                self.now_ms,
                state.label(),
                program_label(charge_core::indicator::program_for(state)),
            ));
            let now = EmuInstant(self.now_ms);
            let frame = self.engine.apply_state(state);
            self.intensity = frame.intensity;
            self.indicator_wake = frame.next_wake.map(|delay| now + delay);
        }

        // Report the latch once when it trips, not on every later sample.
        let flap = self.monitor.hardware_fault();
        if flap && !self.flap_reported {
            out.push(format!(
                "flap fault latched ({} transitions in window)",
                self.monitor.stats().transitions
            ));
        }
        self.flap_reported = flap;
    }

    fn status(&self) -> Vec<String> {
        let stats = self.monitor.stats();
        let last_change = match stats.last_change {
            Some(at) => format!("t={}ms", at.0),
            None => "never".to_string(),
        };

        vec![
            format!(
                "state: {} (last change {}, {} transitions)",
                self.monitor.state().label(),
                last_change,
                stats.transitions
            ),
            format!(
                "mode: {} ({} consecutive errors, {} edges)",
                stats.mode.label(),
                stats.consecutive_errors,
                stats.interrupts
            ),
            format!(
                "flap fault: {}",
                if stats.hardware_fault { "yes" } else { "no" }
            ),
            format!(
                "led: {} (intensity {})",
                program_label(self.engine.program()),
                self.intensity
            ),
            format!("clock: t={}ms", self.now_ms),
        ]
    }
}

fn program_label(program: IndicatorProgram) -> &'static str {
    match program {
        IndicatorProgram::Off => "off",
        IndicatorProgram::SolidOn => "solid",
        IndicatorProgram::Blinking(_) => "blinking",
        IndicatorProgram::Breathing(_) => "breathing",
    }
}

fn help(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => HELP_TOPICS
            .iter()
            .map(|(_, text)| (*text).to_string())
            .collect(),
        Some(topic) => {
            let wanted = topic.to_ascii_lowercase();
            match HELP_TOPICS.iter().find(|(name, _)| *name == wanted.as_str()) {
                Some((_, text)) => vec![(*text).to_string()],
                None => vec![format!("ERR no help for `{topic}`")],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmed_lines(output: &[String]) -> Vec<&String> {
        output
            .iter()
            .filter(|line| line.contains("confirmed"))
            .collect()
    }

    #[test]
    fn plug_confirms_after_stability_window() {
        let mut session = Session::new();

        let output = session.handle_command("plug");
        assert!(confirmed_lines(&output).is_empty(), "edge alone must not confirm");

        let output = session.handle_command("advance 200");
        let confirmed = confirmed_lines(&output);
        assert_eq!(confirmed.len(), 1);
        assert!(confirmed[0].contains("CHARGING"));
        assert!(confirmed[0].contains("t=100ms"));
    }

    #[test]
    fn read_failures_fault_then_recover() {
        let mut session = Session::new();

        session.handle_command("error on");
        let output = session.handle_command("force");
        assert_eq!(confirmed_lines(&output).len(), 1);
        assert!(output.iter().any(|line| line.contains("FAULT")));

        session.handle_command("error off");
        // Recovery needs the full stability window again.
        let output = session.handle_command("advance 40000");
        let confirmed = confirmed_lines(&output);
        assert_eq!(confirmed.len(), 1);
        assert!(confirmed[0].contains("NOT-CHARGING"));
    }

    #[test]
    fn flap_latch_is_reported_once() {
        let mut session = Session::new();
        let mut flap_lines = 0;

        // 102 confirmed transitions inside the 60s window trip the ceiling.
        for _ in 0..51 {
            for command in ["plug", "advance 100", "unplug", "advance 100"] {
                let output = session.handle_command(command);
                flap_lines += output
                    .iter()
                    .filter(|line| line.contains("flap fault latched"))
                    .count();
            }
        }
        assert_eq!(flap_lines, 1, "latch must be reported on its rising edge only");

        // Still latched; later samples stay quiet about it.
        let output = session.handle_command("advance 20000");
        assert!(
            !output.iter().any(|line| line.contains("flap fault latched")),
            "no repeat report while the latch holds"
        );

        session.handle_command("ack");
        let status = session.handle_command("status");
        assert!(status.iter().any(|line| line.contains("flap fault: no")));
    }

    #[test]
    fn unknown_input_is_reported() {
        let mut session = Session::new();
        let output = session.handle_command("frobnicate");
        assert!(output[0].starts_with("ERR"));
    }

    #[test]
    fn status_reflects_the_monitor() {
        let mut session = Session::new();
        session.handle_command("plug");
        session.handle_command("advance 200");

        let status = session.handle_command("status");
        assert!(status[0].contains("CHARGING"));
        assert!(status.iter().any(|line| line.contains("led: breathing")));
    }
}
