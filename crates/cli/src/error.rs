//! Failures of a `drift` invocation and the exit code each one reports.
//!
//! Scripts driving `drift` branch on the exit code, so every failure source
//! lands in exactly one bucket:
//! - 0: the frame was written
//! - 2: clap rejected the command line
//! - 10: the world could not be sized (zero or overflowing width/height)
//! - 11: a file could not be read or written (seed file, PNG frame)
//! - 12: the run was described badly (params out of range, malformed
//!   `--params`, inconsistent seed, unreadable formation mask)
//! - 13: a report or seed could not be serialized

use drift_core::EngineError;
use std::fmt;

/// Why a run stopped before writing its frame.
pub enum CliError {
    /// World sizing failed inside the core.
    Engine(EngineError),
    /// Filesystem access failed.
    Io(String),
    /// The user asked for something the simulation cannot run.
    Input(String),
    /// JSON output could not be produced.
    Serialization(String),
}

impl CliError {
    /// Code passed to `process::exit`.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Engine(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Engine(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CliError({}): {self}", self.exit_code())
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Io(msg) => CliError::Io(msg),
            EngineError::InvalidMask(_) | EngineError::InvalidParams(_) | EngineError::Seed(_) => {
                CliError::Input(e.to_string())
            }
            other => CliError::Engine(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}
