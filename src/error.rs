use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PulseError>;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] Box<bincode::ErrorKind>),
    #[error("Git oracle failed for {path}: {message}")]
    Oracle { path: PathBuf, message: String },
    #[error("Git oracle timed out after {timeout:?} for {path}")]
    Timeout { path: PathBuf, timeout: Duration },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Other: {0}")]
    Other(String),
}

impl PulseError {
    pub fn oracle<P: Into<PathBuf>>(path: P, message: impl Into<String>) -> Self {
        PulseError::Oracle {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<humantime::DurationError> for PulseError {
    fn from(err: humantime::DurationError) -> Self {
        PulseError::Config(format!("Invalid duration: {err}"))
    }
}
