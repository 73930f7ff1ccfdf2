//! Recorded race telemetry and the sources that provide it.

mod csv_source;

pub use csv_source::{CsvTelemetrySource, REQUIRED_COLUMNS};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::AgentError;

pub type Position = (f64, f64, f64);

/// One telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub race_time_ms: f64,
    pub pos: Position,
    pub speed: f64,
    pub checkpoint: i64,
}

impl TelemetrySample {
    pub fn new(race_time_ms: f64, pos: Position, speed: f64, checkpoint: i64) -> Self {
        Self {
            race_time_ms,
            pos,
            speed,
            checkpoint,
        }
    }
}

/// Produces the frames of a recorded session, ordered by race time.
pub trait TelemetrySource {
    fn read_session(&self, session_id: &str) -> Result<Vec<TelemetrySample>, AgentError>;
}

/// Stable sort by race time.
pub fn sort_by_race_time(samples: &mut [TelemetrySample]) {
    samples.sort_by(|a, b| a.race_time_ms.total_cmp(&b.race_time_ms));
}

/// Sessions kept in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryTelemetrySource {
    sessions: HashMap<String, Vec<TelemetrySample>>,
}

impl MemoryTelemetrySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session_id: impl Into<String>, mut samples: Vec<TelemetrySample>) {
        sort_by_race_time(&mut samples);
        self.sessions.insert(session_id.into(), samples);
    }
}

impl TelemetrySource for MemoryTelemetrySource {
    fn read_session(&self, session_id: &str) -> Result<Vec<TelemetrySample>, AgentError> {
        self.sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AgentError::NotFound(PathBuf::from(session_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_orders_by_race_time() {
        let mut source = MemoryTelemetrySource::new();
        source.insert(
            "lap",
            vec![
                TelemetrySample::new(200.0, (0.0, 0.0, 0.0), 0.0, 0),
                TelemetrySample::new(0.0, (0.0, 0.0, 0.0), 0.0, 0),
                TelemetrySample::new(100.0, (0.0, 0.0, 0.0), 0.0, 0),
            ],
        );
        let times: Vec<_> = source
            .read_session("lap")
            .unwrap()
            .iter()
            .map(|s| s.race_time_ms)
            .collect();
        assert_eq!(times, vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn unknown_session_is_not_found() {
        let source = MemoryTelemetrySource::new();
        assert!(matches!(
            source.read_session("missing"),
            Err(AgentError::NotFound(_))
        ));
    }
}
