//! Summary statistics of a recorded run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::telemetry::TelemetrySample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_time_secs: f64,
    pub average_speed: f64,
    pub max_speed: f64,
    /// Highest checkpoint index seen, plus one.
    pub checkpoints: i64,
    /// `(checkpoint, seconds since the previous checkpoint was first reached)`.
    pub splits: Vec<(i64, f64)>,
}

impl PerformanceSummary {
    /// `None` for an empty recording.
    pub fn from_samples(samples: &[TelemetrySample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let total_time_secs = samples
            .iter()
            .map(|s| s.race_time_ms)
            .fold(f64::NEG_INFINITY, f64::max)
            / 1000.0;
        let average_speed = samples.iter().map(|s| s.speed).sum::<f64>() / samples.len() as f64;
        let max_speed = samples.iter().map(|s| s.speed).fold(f64::NEG_INFINITY, f64::max);
        let checkpoints = samples
            .iter()
            .map(|s| s.checkpoint)
            .max()
            .unwrap_or(0)
            .saturating_add(1);

        let mut first_reached: BTreeMap<i64, f64> = BTreeMap::new();
        for s in samples.iter().filter(|s| s.checkpoint >= 0) {
            let t = s.race_time_ms / 1000.0;
            first_reached
                .entry(s.checkpoint)
                .and_modify(|v| *v = v.min(t))
                .or_insert(t);
        }
        let reached: Vec<(i64, f64)> = first_reached.into_iter().collect();
        let splits = reached
            .windows(2)
            .enumerate()
            .map(|(i, w)| (i as i64 + 1, w[1].1 - w[0].1))
            .collect();

        Some(Self {
            total_time_secs,
            average_speed,
            max_speed,
            checkpoints,
            splits,
        })
    }

    pub fn log(&self) {
        info!(
            total_time_secs = self.total_time_secs,
            average_speed = self.average_speed,
            max_speed = self.max_speed,
            checkpoints = self.checkpoints,
            "performance"
        );
        for (cp, secs) in &self.splits {
            info!(checkpoint = cp, split_secs = secs, "split");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarises_a_lap() {
        let samples = vec![
            TelemetrySample::new(0.0, (0.0, 0.0, 0.0), 0.0, 0),
            TelemetrySample::new(1500.0, (0.0, 0.0, 0.0), 100.0, 0),
            TelemetrySample::new(4000.0, (0.0, 0.0, 0.0), 200.0, 1),
            TelemetrySample::new(9000.0, (0.0, 0.0, 0.0), 100.0, 2),
        ];
        let summary = PerformanceSummary::from_samples(&samples).unwrap();
        assert_eq!(summary.total_time_secs, 9.0);
        assert_eq!(summary.average_speed, 100.0);
        assert_eq!(summary.max_speed, 200.0);
        assert_eq!(summary.checkpoints, 3);
        assert_eq!(summary.splits, vec![(1, 4.0), (2, 5.0)]);
    }

    #[test]
    fn extreme_checkpoint_counter_saturates() {
        let samples = vec![
            TelemetrySample::new(0.0, (0.0, 0.0, 0.0), 10.0, 0),
            TelemetrySample::new(2000.0, (0.0, 0.0, 0.0), 10.0, i64::MAX),
        ];
        let summary = PerformanceSummary::from_samples(&samples).unwrap();
        assert_eq!(summary.checkpoints, i64::MAX);
        assert_eq!(summary.splits, vec![(1, 2.0)]);
    }

    #[test]
    fn empty_recording_has_no_summary() {
        assert!(PerformanceSummary::from_samples(&[]).is_none());
    }
}
