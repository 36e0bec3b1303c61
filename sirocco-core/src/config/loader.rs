//! Configuration loader supporting YAML, TOML, and JSON formats.

use serde::de::DeserializeOwned;
use std::path::Path;

use super::ConfigError;

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml)
    #[default]
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

impl ConfigFormat {
    /// Detects the format from a file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "yaml" | "yml" => Some(Self::Yaml),
                "toml" => Some(Self::Toml),
                "json" => Some(Self::Json),
                _ => None,
            })
    }

    /// Returns the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

/// Configuration loader with format detection.
///
/// # Example
///
/// ```rust,ignore
/// use sirocco_core::config::{ConfigLoader, SimulationConfig};
///
/// let config: SimulationConfig = ConfigLoader::new().load_file("backtest.yaml")?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Loads configuration from a file, detecting the format by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the extension is not
    /// recognized, or the content fails to deserialize.
    pub fn load_file<T: DeserializeOwned>(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<T, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnknownFormat(path.display().to_string()))?;
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content, format)
    }

    /// Parses configuration from a string with an explicit format.
    ///
    /// # Errors
    ///
    /// Returns an error if the content fails to deserialize.
    pub fn load_str<T: DeserializeOwned>(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> Result<T, ConfigError> {
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                    format: "yaml",
                    message: e.to_string(),
                })
            }
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "toml",
                message: e.to_string(),
            }),
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                    format: "json",
                    message: e.to_string(),
                })
            }
        }
    }
}
