//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while loading a trace file
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read trace file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid trace format: {0}")]
    InvalidFormat(String),
}

/// Errors reported by the event normalizer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("No trace events found")]
    NoEvents,
}

/// Errors raised by an individual analyzer
///
/// These never cross the engine boundary: the pipeline turns them
/// into `analysis_error` bottlenecks.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Event '{name}' has a non-finite timestamp")]
    InvalidTimestamp { name: String },

    #[error("Event '{name}' at {ts}us has an invalid duration ({dur}us)")]
    InvalidDuration { name: String, ts: f64, dur: f64 },

    #[error("Failed to serialize analysis details: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that can occur while loading analysis options
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse options TOML: {0}")]
    ParseFailed(#[from] toml::de::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
