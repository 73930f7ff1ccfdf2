use csv::{ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{sort_by_race_time, TelemetrySample, TelemetrySource};
use crate::error::AgentError;

/// Columns every telemetry export must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = ["RaceTime", "PosX", "PosY", "PosZ", "Speed", "CurrentCP"];

/// Reads telemetry exports from CSV files.
///
/// A session id is either a path to an existing file or a file stem resolved
/// under `root` (`<root>/<id>.csv`).
#[derive(Debug, Clone)]
pub struct CsvTelemetrySource {
    root: PathBuf,
}

impl Default for CsvTelemetrySource {
    fn default() -> Self {
        Self::new(".")
    }
}

impl CsvTelemetrySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, session_id: &str) -> PathBuf {
        let direct = Path::new(session_id);
        if direct.is_file() {
            return direct.to_path_buf();
        }
        let joined = self.root.join(session_id);
        if joined.is_file() {
            return joined;
        }
        self.root.join(format!("{session_id}.csv"))
    }

    /// Load one file: check the header, drop incomplete rows, sort by time.
    pub fn read_file(&self, path: &Path) -> Result<Vec<TelemetrySample>, AgentError> {
        if !path.is_file() {
            return Err(AgentError::NotFound(path.to_path_buf()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        let columns = ColumnIndex::locate(&headers)?;

        let mut samples = Vec::new();
        let mut dropped = 0usize;
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            match columns.parse(&record) {
                Some(sample) => samples.push(sample),
                None => {
                    dropped += 1;
                    warn!(row = row + 1, file = %path.display(), "dropping incomplete telemetry row");
                }
            }
        }

        sort_by_race_time(&mut samples);
        info!(
            file = %path.display(),
            rows = samples.len(),
            dropped,
            "telemetry loaded"
        );
        Ok(samples)
    }
}

impl TelemetrySource for CsvTelemetrySource {
    fn read_session(&self, session_id: &str) -> Result<Vec<TelemetrySample>, AgentError> {
        self.read_file(&self.resolve(session_id))
    }
}

struct ColumnIndex {
    race_time: usize,
    pos_x: usize,
    pos_y: usize,
    pos_z: usize,
    speed: usize,
    checkpoint: usize,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord) -> Result<Self, AgentError> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| find(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(AgentError::MissingField(missing));
        }

        let index = |name: &str| find(name).ok_or_else(|| AgentError::MissingField(vec![name.to_string()]));
        Ok(Self {
            race_time: index("RaceTime")?,
            pos_x: index("PosX")?,
            pos_y: index("PosY")?,
            pos_z: index("PosZ")?,
            speed: index("Speed")?,
            checkpoint: index("CurrentCP")?,
        })
    }

    fn parse(&self, record: &StringRecord) -> Option<TelemetrySample> {
        let float = |idx: usize| -> Option<f64> {
            let v: f64 = record.get(idx)?.parse().ok()?;
            (!v.is_nan()).then_some(v)
        };

        Some(TelemetrySample::new(
            float(self.race_time)?,
            (float(self.pos_x)?, float(self.pos_y)?, float(self.pos_z)?),
            float(self.speed)?,
            parse_checkpoint(record.get(self.checkpoint)?)?,
        ))
    }
}

/// Exports sometimes write the counter as `3.0`.
fn parse_checkpoint(raw: &str) -> Option<i64> {
    if let Ok(cp) = raw.parse::<i64>() {
        return Some(cp);
    }
    let v: f64 = raw.parse().ok()?;
    (v.is_finite() && v.fract() == 0.0).then_some(v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_sorts_and_drops_incomplete_rows() {
        let file = write_csv(
            "RaceTime,PosX,PosY,PosZ,Speed,CurrentCP,Gear\n\
             200,12,0,0,50,1,3\n\
             0,0,0,0,0,0,1\n\
             150,,0,0,50,0,2\n\
             100,12,0,0,50,0.0,2\n",
        );
        let samples = CsvTelemetrySource::default().read_file(file.path()).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].race_time_ms, 0.0);
        assert_eq!(samples[1], TelemetrySample::new(100.0, (12.0, 0.0, 0.0), 50.0, 0));
        assert_eq!(samples[2].checkpoint, 1);
    }

    #[test]
    fn missing_columns_are_reported() {
        let file = write_csv("RaceTime,PosX,PosY,Speed\n0,0,0,0\n");
        match CsvTelemetrySource::default().read_file(file.path()) {
            Err(AgentError::MissingField(cols)) => {
                assert_eq!(cols, vec!["PosZ".to_string(), "CurrentCP".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let source = CsvTelemetrySource::new("/definitely/not/here");
        assert!(matches!(
            source.read_session("lap1"),
            Err(AgentError::NotFound(_))
        ));
    }

    #[test]
    fn session_id_resolves_under_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lap1.csv"),
            "RaceTime,PosX,PosY,PosZ,Speed,CurrentCP\n0,1,2,3,4,0\n",
        )
        .unwrap();
        let source = CsvTelemetrySource::new(dir.path());
        let samples = source.read_session("lap1").unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].pos, (1.0, 2.0, 3.0));
    }

    #[test]
    fn checkpoint_accepts_integral_floats_only() {
        assert_eq!(parse_checkpoint("4"), Some(4));
        assert_eq!(parse_checkpoint("4.0"), Some(4));
        assert_eq!(parse_checkpoint("4.5"), None);
        assert_eq!(parse_checkpoint(""), None);
    }
}
