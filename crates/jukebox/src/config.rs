//! Configuration system
//!
//! Engine settings are plain serde structs with sensible defaults; anything
//! implementing [`Config`] can be loaded from and saved to TOML files.

use serde::{Deserialize, Serialize};

use crate::audio::spatial::SpatialConfig;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from a TOML file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a TOML file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

/// Top-level jukebox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JukeboxConfig {
    /// Global volume applied to every track and one-shot (0.0 to 1.0)
    pub volume: f32,

    /// Path prefix prepended to every resolved sound URL
    pub base_path: String,

    /// Spatial falloff parameters shared by all sounds
    pub spatial: SpatialConfig,
}

impl Default for JukeboxConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            base_path: String::new(),
            spatial: SpatialConfig::default(),
        }
    }
}

impl Config for JukeboxConfig {}
