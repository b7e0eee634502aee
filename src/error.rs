//! Error types for linetrim.
//!
//! Every fallible library operation returns [`Result`]. The TUI turns these
//! into status-line messages; only a broken planform outline at startup is
//! fatal.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for linetrim operations.
#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    /// Reading or writing a file failed.
    #[error("cannot access '{path}': {source}")]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Atomically replacing a file failed.
    #[error("cannot replace '{path}': {source}")]
    Persist {
        /// Destination of the rename.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: tempfile::PersistError,
    },

    // === Input Format Errors ===
    /// The line length table is malformed.
    #[error("line length table is not readable: {0}")]
    Profile(#[from] ProfileError),

    /// The planform outline is malformed.
    #[error("planform outline line {line}: {message}")]
    Outline {
        /// 1-based line number, 0 for whole-file problems.
        line: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// A project file parsed as JSON but does not describe a valid session.
    #[error("invalid project file: {message}")]
    Project {
        /// Description of the inconsistency.
        message: String,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the CSV report failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // === Configuration Errors ===
    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the validation failure.
        message: String,
    },
}

/// Reasons a line length table can be rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("line {line}: '{text}' is not a length")]
    InvalidLength { line: usize, text: String },

    #[error("line {line}: length {value} must be positive")]
    NonPositiveLength { line: usize, value: f64 },

    #[error("line {line}: length found before the first '*' row marker")]
    LengthOutsideRow { line: usize },

    #[error("row '{name}' has no lengths")]
    EmptyRow { name: String },

    #[error("no rows found")]
    NoRows,
}

/// A specialized Result type for linetrim operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error with the path it happened on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an outline error for a given line.
    #[must_use]
    pub fn outline(line: usize, message: impl Into<String>) -> Self {
        Self::Outline {
            line,
            message: message.into(),
        }
    }

    /// Create a project consistency error.
    #[must_use]
    pub fn project(message: impl Into<String>) -> Self {
        Self::Project {
            message: message.into(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
