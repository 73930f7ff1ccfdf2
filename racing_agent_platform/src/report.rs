//! Reporting data handed to whatever presents training progress.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Rolling-mean window used when a report is exported.
pub const DEFAULT_ROLLING_WINDOW: usize = 100;

/// Outcome of a training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Summed reward of each episode, in order.
    pub episode_rewards: Vec<f64>,
    /// Exploration rate left after the last decay.
    pub final_epsilon: f64,
}

impl TrainingReport {
    pub fn episodes(&self) -> usize {
        self.episode_rewards.len()
    }

    /// Trailing mean over `window` episodes; `None` until the window is full.
    pub fn rolling_mean(&self, window: usize) -> Vec<Option<f64>> {
        rolling_mean(&self.episode_rewards, window)
    }

    pub fn best_episode(&self) -> Option<(usize, f64)> {
        self.episode_rewards
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Write rewards plus rolling mean as pretty JSON.
    pub fn write_json(&self, path: &Path, window: usize) -> Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            episode_rewards: &'a [f64],
            rolling_window: usize,
            rolling_mean: Vec<Option<f64>>,
            final_epsilon: f64,
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let export = Export {
            episode_rewards: &self.episode_rewards,
            rolling_window: window,
            rolling_mean: self.rolling_mean(window),
            final_epsilon: self.final_epsilon,
        };
        let json = serde_json::to_string_pretty(&export)?;
        std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        Ok(())
    }
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut sum = 0.0;
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            sum += v;
            if i >= window {
                sum -= values[i - window];
            }
            (i + 1 >= window).then(|| sum / window as f64)
        })
        .collect()
}

/// Periodic heartbeat from the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressTick {
    pub frame: usize,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_waits_for_a_full_window() {
        let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(means, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn window_larger_than_history_yields_nothing() {
        assert!(rolling_mean(&[1.0, 2.0], 100).iter().all(Option::is_none));
    }

    #[test]
    fn best_episode_is_the_maximum() {
        let report = TrainingReport {
            episode_rewards: vec![3.0, 9.0, -1.0],
            final_epsilon: 0.2,
        };
        assert_eq!(report.best_episode(), Some((1, 9.0)));
    }

    #[test]
    fn writes_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("rewards.json");
        let report = TrainingReport {
            episode_rewards: vec![1.0, 3.0],
            final_epsilon: 0.29,
        };
        report.write_json(&path, 2).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["rolling_mean"][1], 2.0);
        assert!(value["rolling_mean"][0].is_null());
    }
}
