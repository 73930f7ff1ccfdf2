use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by ingestion and model persistence.
///
/// Numeric work (encoding, reward, Q updates) is total and never produces one
/// of these.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("telemetry is missing required field(s): {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("corrupt model {path}: {reason}")]
    CorruptModel { path: PathBuf, reason: String },

    #[error("unknown action '{0}'")]
    InvalidAction(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AgentError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AgentError::CorruptModel {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
