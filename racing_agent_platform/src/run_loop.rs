//! Real-time replay of a learned policy.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::actuator::Actuator;
use crate::agent::{Policy, QTable, StateEncoder};
use crate::clock::Clock;
use crate::report::ProgressTick;
use crate::stagnation::{StagnationConfig, StagnationMonitor};
use crate::telemetry::TelemetrySample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Exploration while driving; 0 drives greedily.
    pub epsilon: f64,
    /// Countdown before the first frame, to get the car on the start line.
    pub start_delay_secs: f64,
    /// Emit a progress tick every this many frames.
    pub progress_interval: usize,
    /// Pause between releasing the inputs and pressing restart.
    pub settle_delay_secs: f64,
    /// How long the restart key is held.
    pub restart_pulse_secs: f64,
    /// Wait for the game to reset the session after a restart.
    pub reset_wait_secs: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.0,
            start_delay_secs: 3.0,
            progress_interval: 60,
            settle_delay_secs: 0.5,
            restart_pulse_secs: 0.1,
            reset_wait_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub frames: usize,
    /// The car got stuck and the race was restarted; the loop stopped there.
    pub restarted: bool,
    pub ticks: Vec<ProgressTick>,
    pub elapsed: Duration,
}

/// Drives the recorded schedule: one action per telemetry frame, paced to the
/// frame's race time.
///
/// After a stagnation-triggered restart the loop stops rather than resuming.
pub struct RunLoop<'t, A, C, R> {
    table: &'t mut QTable,
    policy: Policy<R>,
    actuator: A,
    clock: C,
    monitor: StagnationMonitor,
    encoder: StateEncoder,
    config: RunConfig,
}

impl<'t, A, C, R> RunLoop<'t, A, C, R>
where
    A: Actuator,
    C: Clock,
    R: Rng,
{
    pub fn new(
        table: &'t mut QTable,
        actuator: A,
        clock: C,
        rng: R,
        config: RunConfig,
        stagnation: StagnationConfig,
    ) -> Self {
        let monitor = StagnationMonitor::new(stagnation, clock.now());
        Self {
            table,
            policy: Policy::new(rng),
            actuator,
            clock,
            monitor,
            encoder: StateEncoder::default(),
            config,
        }
    }

    pub fn with_encoder(mut self, encoder: StateEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }

    #[instrument(skip(self, samples), fields(frames = samples.len()))]
    pub fn run(&mut self, samples: &[TelemetrySample]) -> RunOutcome {
        if self.config.start_delay_secs > 0.0 {
            info!(delay_secs = self.config.start_delay_secs, "starting soon, place the car on the start line");
            self.clock.sleep(secs(self.config.start_delay_secs));
        }

        let start = self.clock.now();
        self.monitor.reset(start);
        self.actuator.release_all();
        info!("run started");

        let mut frames = 0;
        let mut ticks = Vec::new();
        let mut restarted = false;

        for (frame, sample) in samples.iter().enumerate() {
            let state = self.encoder.encode(sample);
            let action = self
                .policy
                .choose_action(self.table, &state, self.config.epsilon);
            self.actuator.apply(action);
            frames += 1;

            if self.monitor.observe(sample.pos, self.clock.now()) {
                warn!(frame, "car is stuck, restarting the race");
                self.recover();
                restarted = true;
                break;
            }

            self.clock
                .sleep_until(start + secs(sample.race_time_ms / 1000.0));

            if self.config.progress_interval > 0 && frame % self.config.progress_interval == 0 {
                let tick = ProgressTick {
                    frame,
                    elapsed: self.clock.now().saturating_duration_since(start),
                };
                info!(frame, elapsed_ms = tick.elapsed.as_millis() as u64, "progress");
                ticks.push(tick);
            }
        }

        if !restarted {
            self.actuator.release_all();
        }

        let elapsed = self.clock.now().saturating_duration_since(start);
        info!(frames, restarted, elapsed_ms = elapsed.as_millis() as u64, "run finished");
        RunOutcome {
            frames,
            restarted,
            ticks,
            elapsed,
        }
    }

    /// Release everything, pulse the restart trigger, wait for the session to
    /// come back and re-arm the stagnation clock.
    pub fn recover(&mut self) {
        self.actuator.release_all();
        self.clock.sleep(secs(self.config.settle_delay_secs));

        self.actuator.restart_trigger(true);
        self.clock.sleep(secs(self.config.restart_pulse_secs));
        self.actuator.restart_trigger(false);

        self.clock.sleep(secs(self.config.reset_wait_secs));
        self.monitor.reset(self.clock.now());
    }
}

/// Negative and non-finite delays collapse to zero.
fn secs(s: f64) -> Duration {
    Duration::try_from_secs_f64(s).unwrap_or(Duration::ZERO)
}
