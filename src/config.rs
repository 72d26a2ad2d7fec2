// Topic and scale configuration, loaded once from a JSON descriptor
use std::path::{Path, PathBuf};

use serde::Deserialize;

// Topic used when the descriptor does not name one
pub const DEFAULT_TOPIC: &str = "/cmd_vel";

// Scale applied to unit intents when not overridden
pub const DEFAULT_SCALE: f64 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Scale `{name}` must be a positive finite number, got {value}")]
    InvalidScale { name: &'static str, value: f64 },

    #[error("Topic name must not be empty")]
    EmptyTopic,

    #[error("Failed to load zenoh config {path}: {source}")]
    Zenoh {
        path: PathBuf,
        source: zenoh::Error,
    },
}

/// Multipliers turning a unit intent into a velocity command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleConfig {
    pub linear_scale: f64,
    pub angular_scale: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            linear_scale: DEFAULT_SCALE,
            angular_scale: DEFAULT_SCALE,
        }
    }
}

impl ScaleConfig {
    pub fn new(linear_scale: f64, angular_scale: f64) -> Result<Self, ConfigError> {
        check_scale("linear_scale", linear_scale)?;
        check_scale("angular_scale", angular_scale)?;
        Ok(Self {
            linear_scale,
            angular_scale,
        })
    }
}

fn check_scale(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidScale { name, value })
    }
}

// On-disk shape of the descriptor; every field is optional
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Descriptor {
    #[serde(alias = "twist_topic")]
    topic: String,
    #[serde(alias = "scale_linear")]
    linear_scale: f64,
    #[serde(alias = "scale_angular")]
    angular_scale: f64,
    zenoh_config: Option<PathBuf>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            linear_scale: DEFAULT_SCALE,
            angular_scale: DEFAULT_SCALE,
            zenoh_config: None,
        }
    }
}

/// Validated startup configuration
#[derive(Debug, Clone)]
pub struct TeleopConfig {
    topic: String,
    scale: ScaleConfig,
    zenoh_config: Option<PathBuf>,
}

impl TeleopConfig {
    /// Read and validate the descriptor at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let descriptor: Descriptor =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_descriptor(descriptor)
    }

    fn from_descriptor(descriptor: Descriptor) -> Result<Self, ConfigError> {
        if descriptor.topic.trim_matches('/').is_empty() {
            return Err(ConfigError::EmptyTopic);
        }
        let scale = ScaleConfig::new(descriptor.linear_scale, descriptor.angular_scale)?;
        Ok(Self {
            topic: descriptor.topic,
            scale,
            zenoh_config: descriptor.zenoh_config,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn scale(&self) -> ScaleConfig {
        self.scale
    }

    /// Zenoh session config: the referenced file, or zenoh's defaults
    pub fn zenoh_config(&self) -> Result<zenoh::Config, ConfigError> {
        match &self.zenoh_config {
            Some(path) => zenoh::Config::from_file(path).map_err(|source| ConfigError::Zenoh {
                path: path.clone(),
                source,
            }),
            None => Ok(zenoh::Config::default()),
        }
    }
}
