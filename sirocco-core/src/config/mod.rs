//! Configuration management.
//!
//! Provides the simulation configuration surface and a loader supporting
//! YAML, TOML, and JSON files.

mod loader;
mod simulation;

pub use loader::{ConfigFormat, ConfigLoader};
pub use simulation::SimulationConfig;

/// Configuration error type.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File extension is not a recognized format
    #[error("unrecognized config format for path: {0}")]
    UnknownFormat(String),

    /// Content could not be deserialized
    #[error("failed to parse {format} config: {message}")]
    Parse {
        /// Format that was attempted
        format: &'static str,
        /// Parser error message
        message: String,
    },

    /// Values failed semantic validation
    #[error("invalid configuration: {0}")]
    Validation(String),
}
