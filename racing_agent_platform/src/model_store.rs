//! Persistence of Q-tables.
//!
//! A saved model is a flat list of `(state, action, value)` entries plus the
//! canonical action list it was written with, so loading never depends on
//! map iteration order. JSON is the default encoding; `.bin` files use
//! bincode.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::agent::{Action, QLearningConfig, QTable, StateKey};
use crate::error::AgentError;

pub const MODEL_FORMAT_VERSION: u32 = 1;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Length of a [`STAMP_FORMAT`] timestamp.
const STAMP_LEN: usize = 15;

fn is_stamp(s: &str) -> bool {
    s.len() == STAMP_LEN
        && s.char_indices()
            .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() })
}

/// Ordering key of a saved model file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SaveRank {
    stamp: String,
    suffix: u32,
    preferred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    #[default]
    Json,
    Bincode,
}

impl ModelFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::Json => "json",
            ModelFormat::Bincode => "bin",
        }
    }

    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bin") => ModelFormat::Bincode,
            _ => ModelFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStoreConfig {
    pub directory: PathBuf,
    pub format: ModelFormat,
    pub file_prefix: String,
}

impl Default for ModelStoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("models"),
            format: ModelFormat::Json,
            file_prefix: "q_table".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedModel {
    format_version: u32,
    learning_rate: f64,
    discount_factor: f64,
    actions: Vec<String>,
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    state: PersistedState,
    action: String,
    value: PersistedFloat,
}

/// `[x, y, z, speed, checkpoint]`.
type PersistedState = (PersistedFloat, PersistedFloat, PersistedFloat, PersistedFloat, i64);

fn persist_state(state: &StateKey) -> PersistedState {
    (
        PersistedFloat(state.x),
        PersistedFloat(state.y),
        PersistedFloat(state.z),
        PersistedFloat(state.speed),
        state.checkpoint,
    )
}

fn restore_state((x, y, z, speed, checkpoint): PersistedState) -> StateKey {
    StateKey::new(x.0, y.0, z.0, speed.0, checkpoint)
}

/// An `f64` that survives text encodings. JSON has no literal for NaN or the
/// infinities, so those are written as the strings `"NaN"`, `"inf"` and
/// `"-inf"`. Binary encodings store the raw float.
#[derive(Debug, Clone, Copy)]
struct PersistedFloat(f64);

impl Serialize for PersistedFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() || !serializer.is_human_readable() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

impl<'de> Deserialize<'de> for PersistedFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(PersistedFloatVisitor)
        } else {
            f64::deserialize(deserializer).map(PersistedFloat)
        }
    }
}

struct PersistedFloatVisitor;

impl<'de> Visitor<'de> for PersistedFloatVisitor {
    type Value = PersistedFloat;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(PersistedFloat(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(PersistedFloat(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(PersistedFloat(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        match v {
            "NaN" => Ok(PersistedFloat(f64::NAN)),
            "inf" => Ok(PersistedFloat(f64::INFINITY)),
            "-inf" => Ok(PersistedFloat(f64::NEG_INFINITY)),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

impl PersistedModel {
    fn from_table(table: &QTable) -> Self {
        let config = table.config();
        Self {
            format_version: MODEL_FORMAT_VERSION,
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
            actions: Action::ALL.iter().map(|a| a.tag().to_string()).collect(),
            entries: table
                .entries()
                .map(|(state, action, value)| PersistedEntry {
                    state: persist_state(&state),
                    action: action.tag().to_string(),
                    value: PersistedFloat(value),
                })
                .collect(),
        }
    }

    fn into_table(self, path: &Path) -> Result<QTable, AgentError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(AgentError::corrupt(
                path,
                format!("unsupported format version {}", self.format_version),
            ));
        }

        let expected: Vec<&str> = Action::ALL.iter().map(|a| a.tag()).collect();
        if self.actions != expected {
            return Err(AgentError::corrupt(
                path,
                format!("action set {:?} does not match {:?}", self.actions, expected),
            ));
        }

        let mut table = QTable::new(QLearningConfig {
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
        });
        for entry in self.entries {
            let action: Action = entry
                .action
                .parse()
                .map_err(|e| AgentError::corrupt(path, e))?;
            table.set_value(&restore_state(entry.state), action, entry.value.0);
        }
        Ok(table)
    }
}

/// Reads and writes Q-tables under a model directory.
#[derive(Debug, Clone, Default)]
pub struct ModelStore {
    config: ModelStoreConfig,
}

impl ModelStore {
    pub fn new(config: ModelStoreConfig) -> Self {
        Self { config }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Write `table` to a new timestamped file and return its path.
    pub fn save(&self, table: &QTable) -> Result<PathBuf, AgentError> {
        fs::create_dir_all(&self.config.directory)?;
        let path = self.next_path(&chrono::Local::now().format(STAMP_FORMAT).to_string());
        self.save_to(table, &path)?;
        Ok(path)
    }

    /// Write `table` to `path`, picking the encoding from its extension.
    #[instrument(skip(self, table), fields(states = table.len()))]
    pub fn save_to(&self, table: &QTable, path: &Path) -> Result<(), AgentError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let model = PersistedModel::from_table(table);
        let bytes = match ModelFormat::from_path(path) {
            ModelFormat::Json => serde_json::to_vec_pretty(&model)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            ModelFormat::Bincode => bincode::serialize(&model)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
        };
        fs::write(path, bytes)?;

        info!(path = %path.display(), states = table.len(), "model saved");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn load(&self, path: &Path) -> Result<QTable, AgentError> {
        if !path.is_file() {
            return Err(AgentError::NotFound(path.to_path_buf()));
        }

        let bytes = fs::read(path)?;
        let model: PersistedModel = match ModelFormat::from_path(path) {
            ModelFormat::Json => {
                serde_json::from_slice(&bytes).map_err(|e| AgentError::corrupt(path, e))?
            }
            ModelFormat::Bincode => {
                bincode::deserialize(&bytes).map_err(|e| AgentError::corrupt(path, e))?
            }
        };
        let table = model.into_table(path)?;

        info!(path = %path.display(), states = table.len(), "model loaded");
        Ok(table)
    }

    /// Most recent model written by [`save`](Self::save), if any.
    ///
    /// Ranked by timestamp, then collision suffix; between two formats with the
    /// same name the configured one wins. Unrelated files are ignored.
    pub fn latest(&self) -> Result<Option<PathBuf>, AgentError> {
        if !self.config.directory.is_dir() {
            return Ok(None);
        }
        let mut newest: Option<(SaveRank, PathBuf)> = None;
        for entry in fs::read_dir(&self.config.directory)? {
            let path = entry?.path();
            let Some(rank) = self.rank(&path) else {
                continue;
            };
            if newest.as_ref().map_or(true, |(best, _)| rank > *best) {
                newest = Some((rank, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }

    /// Parse `<prefix>_<YYYYmmdd_HHMMSS>[_<n>].<ext>`.
    fn rank(&self, path: &Path) -> Option<SaveRank> {
        let stem = path.file_stem()?.to_str()?;
        let ext = path.extension()?.to_str()?;
        if ext != ModelFormat::Json.extension() && ext != ModelFormat::Bincode.extension() {
            return None;
        }
        let rest = stem.strip_prefix(&self.config.file_prefix)?.strip_prefix('_')?;
        let stamp = rest.get(..STAMP_LEN)?;
        if !is_stamp(stamp) {
            return None;
        }
        let suffix = match &rest[STAMP_LEN..] {
            "" => 0,
            tail => tail.strip_prefix('_')?.parse().ok()?,
        };
        Some(SaveRank {
            stamp: stamp.to_string(),
            suffix,
            preferred: ext == self.config.format.extension(),
        })
    }

    fn next_path(&self, stamp: &str) -> PathBuf {
        let ext = self.config.format.extension();
        let base = format!("{}_{}", self.config.file_prefix, stamp);
        let mut path = self.config.directory.join(format!("{base}.{ext}"));
        let mut n = 1;
        while path.exists() {
            path = self.config.directory.join(format!("{base}_{n}.{ext}"));
            n += 1;
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path, format: ModelFormat) -> ModelStore {
        ModelStore::new(ModelStoreConfig {
            directory: dir.to_path_buf(),
            format,
            ..ModelStoreConfig::default()
        })
    }

    #[test]
    fn save_names_files_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), ModelFormat::Json);
        let mut table = QTable::default();
        table.set_value(&StateKey::new(0.0, 0.0, 0.0, 0.0, 0), Action::Left, 1.0);

        let first = store.save(&table).unwrap();
        let second = store.save(&table).unwrap();
        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("q_table_"));
        assert!(name.ends_with(".json"));
        assert!(store.latest().unwrap().is_some());
    }

    #[test]
    fn empty_table_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), ModelFormat::Bincode);
        let path = store.save(&QTable::default()).unwrap();
        assert!(store.load(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_not_found() {
        let store = ModelStore::default();
        assert!(matches!(
            store.load(Path::new("/no/such/model.json")),
            Err(AgentError::NotFound(_))
        ));
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            ModelStore::default().load(&path),
            Err(AgentError::CorruptModel { .. })
        ));
    }

    #[test]
    fn latest_on_missing_directory_is_none() {
        let store = store_in(Path::new("/no/such/dir"), ModelFormat::Json);
        assert_eq!(store.latest().unwrap(), None);
    }

    #[test]
    fn non_finite_keys_and_values_survive_both_formats() {
        let inf_key = StateKey::new(f64::INFINITY, 0.0, f64::NEG_INFINITY, 5.0, 1);
        let nan_key = StateKey::new(f64::NAN, 10.0, 0.0, f64::NAN, 2);
        let mut table = QTable::default();
        table.set_value(&inf_key, Action::Accelerate, 12.5);
        table.set_value(&nan_key, Action::Brake, f64::NAN);
        table.set_value(&nan_key, Action::Left, f64::NEG_INFINITY);

        for format in [ModelFormat::Json, ModelFormat::Bincode] {
            let dir = tempfile::tempdir().unwrap();
            let store = store_in(dir.path(), format);
            let path = store.save(&table).unwrap();
            let loaded = store.load(&path).unwrap();

            assert_eq!(loaded.len(), 2, "{format:?}");
            assert_eq!(loaded.row(&inf_key).unwrap()[Action::Accelerate.index()], 12.5);
            let nan_row = loaded.row(&nan_key).unwrap();
            assert!(nan_row[Action::Brake.index()].is_nan());
            assert_eq!(nan_row[Action::Left.index()], f64::NEG_INFINITY);
            assert_eq!(nan_row[Action::Right.index()], 0.0);
        }
    }

    #[test]
    fn json_spells_out_non_finite_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut table = QTable::default();
        table.set_value(&StateKey::new(f64::INFINITY, 0.0, 0.0, 0.0, 0), Action::Nothing, f64::NAN);
        ModelStore::default().save_to(&table, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"inf\""));
        assert!(text.contains("\"NaN\""));
        assert!(!text.contains("null"));
    }

    #[test]
    fn latest_orders_by_stamp_then_suffix() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "q_table_20260101_120000_9.json",
            "q_table_20260101_120000_10.json",
            "q_table_20250101_235959_99.json",
            "q_table_notes.json",
            "q_table_20260101_120000_10.txt",
        ] {
            fs::write(dir.path().join(name), b"{}").unwrap();
        }
        let store = store_in(dir.path(), ModelFormat::Json);
        assert_eq!(
            store.latest().unwrap(),
            Some(dir.path().join("q_table_20260101_120000_10.json"))
        );
    }

    #[test]
    fn latest_prefers_configured_format_on_equal_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("q_table_20260101_120000.json"), b"{}").unwrap();
        fs::write(dir.path().join("q_table_20260101_120000.bin"), b"").unwrap();

        let bin = store_in(dir.path(), ModelFormat::Bincode);
        assert_eq!(
            bin.latest().unwrap(),
            Some(dir.path().join("q_table_20260101_120000.bin"))
        );
        let json = store_in(dir.path(), ModelFormat::Json);
        assert_eq!(
            json.latest().unwrap(),
            Some(dir.path().join("q_table_20260101_120000.json"))
        );
    }
}
