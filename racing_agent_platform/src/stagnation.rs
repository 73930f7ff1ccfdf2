//! Detects a car that has stopped making progress.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::telemetry::Position;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagnationConfig {
    /// Displacement (world units) that counts as movement.
    pub movement_threshold: f64,
    /// Seconds without movement before the car is declared stuck.
    pub stagnation_threshold_secs: f64,
}

impl Default for StagnationConfig {
    fn default() -> Self {
        Self {
            movement_threshold: 0.5,
            stagnation_threshold_secs: 3.0,
        }
    }
}

impl StagnationConfig {
    /// Negative and NaN thresholds collapse to zero; overflow saturates.
    pub fn threshold(&self) -> Duration {
        let secs = self.stagnation_threshold_secs;
        if secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagnationPhase {
    Tracking,
    Stagnant,
}

#[derive(Debug, Clone)]
pub struct StagnationMonitor {
    config: StagnationConfig,
    last_position: Option<Position>,
    last_movement_time: Instant,
    phase: StagnationPhase,
}

impl StagnationMonitor {
    pub fn new(config: StagnationConfig, now: Instant) -> Self {
        Self {
            config,
            last_position: None,
            last_movement_time: now,
            phase: StagnationPhase::Tracking,
        }
    }

    pub fn phase(&self) -> StagnationPhase {
        self.phase
    }

    pub fn last_position(&self) -> Option<Position> {
        self.last_position
    }

    pub fn last_movement_time(&self) -> Instant {
        self.last_movement_time
    }

    /// Feed one raw position. Returns `true` once the car has stayed within
    /// the movement threshold for longer than the stagnation threshold; the
    /// caller must then recover and [`reset`](Self::reset) the monitor.
    pub fn observe(&mut self, position: Position, now: Instant) -> bool {
        let Some(last) = self.last_position else {
            self.last_position = Some(position);
            self.last_movement_time = now;
            self.phase = StagnationPhase::Tracking;
            return false;
        };

        if distance(last, position) > self.config.movement_threshold {
            self.last_movement_time = now;
            self.last_position = Some(position);
            self.phase = StagnationPhase::Tracking;
            return false;
        }

        let still_for = now.saturating_duration_since(self.last_movement_time);
        if still_for > self.config.threshold() {
            if self.phase == StagnationPhase::Tracking {
                warn!(?position, still_for = ?still_for, "car is stuck");
            }
            self.phase = StagnationPhase::Stagnant;
            return true;
        }

        false
    }

    /// Re-arm the clock after recovery. The last known position is kept.
    pub fn reset(&mut self, now: Instant) {
        self.last_movement_time = now;
        self.phase = StagnationPhase::Tracking;
    }
}

fn distance(a: Position, b: Position) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    let dz = a.2 - b.2;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn first_observation_never_signals() {
        let t0 = Instant::now();
        let mut monitor = StagnationMonitor::new(StagnationConfig::default(), t0);
        assert!(!monitor.observe((5.0, 5.0, 5.0), t0 + secs(100.0)));
    }

    #[test]
    fn signals_after_threshold_without_movement() {
        let t0 = Instant::now();
        let mut monitor = StagnationMonitor::new(StagnationConfig::default(), t0);
        assert!(!monitor.observe((0.0, 0.0, 0.0), t0));
        assert!(!monitor.observe((0.2, 0.0, 0.0), t0 + secs(1.0)));
        assert!(!monitor.observe((0.3, 0.1, 0.0), t0 + secs(3.0)));
        assert!(monitor.observe((0.3, 0.1, 0.0), t0 + secs(3.1)));
        assert_eq!(monitor.phase(), StagnationPhase::Stagnant);
    }

    #[test]
    fn movement_resets_the_clock() {
        let t0 = Instant::now();
        let mut monitor = StagnationMonitor::new(StagnationConfig::default(), t0);
        monitor.observe((0.0, 0.0, 0.0), t0);
        assert!(!monitor.observe((1.0, 0.0, 0.0), t0 + secs(2.5)));
        assert!(!monitor.observe((1.0, 0.0, 0.0), t0 + secs(5.0)));
        assert!(monitor.observe((1.0, 0.0, 0.0), t0 + secs(5.6)));
    }

    #[test]
    fn small_steps_do_not_count_as_movement() {
        let t0 = Instant::now();
        let mut monitor = StagnationMonitor::new(StagnationConfig::default(), t0);
        monitor.observe((0.0, 0.0, 0.0), t0);
        // Each step is under the threshold relative to the anchored position.
        for i in 1..=7 {
            let x = 0.07 * i as f64;
            let stuck = monitor.observe((x, 0.0, 0.0), t0 + secs(0.5 * i as f64));
            assert_eq!(stuck, i == 7, "step {i}");
        }
    }

    #[test]
    fn reset_rearms_after_recovery() {
        let t0 = Instant::now();
        let mut monitor = StagnationMonitor::new(StagnationConfig::default(), t0);
        monitor.observe((0.0, 0.0, 0.0), t0);
        assert!(monitor.observe((0.0, 0.0, 0.0), t0 + secs(4.0)));

        monitor.reset(t0 + secs(4.0));
        assert_eq!(monitor.phase(), StagnationPhase::Tracking);
        assert!(!monitor.observe((0.0, 0.0, 0.0), t0 + secs(6.0)));
        assert!(monitor.observe((0.0, 0.0, 0.0), t0 + secs(7.5)));
    }

    #[test]
    fn invalid_thresholds_do_not_panic() {
        for bad in [-1.0, f64::NAN, f64::NEG_INFINITY] {
            let config = StagnationConfig {
                stagnation_threshold_secs: bad,
                ..StagnationConfig::default()
            };
            assert_eq!(config.threshold(), Duration::ZERO);
        }
        let forever = StagnationConfig {
            stagnation_threshold_secs: f64::INFINITY,
            ..StagnationConfig::default()
        };
        assert_eq!(forever.threshold(), Duration::MAX);

        let t0 = Instant::now();
        let config = StagnationConfig {
            stagnation_threshold_secs: -5.0,
            ..StagnationConfig::default()
        };
        let mut monitor = StagnationMonitor::new(config, t0);
        assert!(!monitor.observe((0.0, 0.0, 0.0), t0));
        assert!(monitor.observe((0.0, 0.0, 0.0), t0 + secs(0.1)));
    }
}
