use std::{fmt, path::Path, str::FromStr};

use crate::{activity::ActivityType, navigation::WAYPOINT_RADIUS_M};

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Syntax { line: usize, content: String },
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(reason) => write!(f, "Failed to read configuration: {}", reason),
            ConfigError::Syntax { line, content } => write!(f, "Expected key = value on line {}: {:?}", line, content),
            ConfigError::InvalidValue { key, value } => write!(f, "Invalid value {:?} for {}", value, key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Tunables read from a `key = value` file. Lines starting with `#` are comments.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub waypoint_radius_m: f64,
    pub activity_type: ActivityType,
    pub command_buffer: usize,
    pub snapshot_interval_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            waypoint_radius_m: WAYPOINT_RADIUS_M,
            activity_type: ActivityType::Run,
            command_buffer: 100,
            snapshot_interval_ms: 1000,
        }
    }
}

impl TrackerConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = TrackerConfig::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: number + 1, content: line.to_string() });
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "waypoint_radius_m" => {
                    config.waypoint_radius_m = parse_value(key, value)?;
                    if !(config.waypoint_radius_m > 0.0) {
                        return Err(invalid(key, value));
                    }
                }
                "activity_type" => config.activity_type = parse_value(key, value)?,
                "command_buffer" => {
                    config.command_buffer = parse_value(key, value)?;
                    if config.command_buffer == 0 {
                        return Err(invalid(key, value));
                    }
                }
                "snapshot_interval_ms" => {
                    config.snapshot_interval_ms = parse_value(key, value)?;
                    if config.snapshot_interval_ms == 0 {
                        return Err(invalid(key, value));
                    }
                }
                _ => tracing::warn!("Unknown config key: {}", key),
            }
        }

        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{:?}: {}", path, e)))?;
        Self::parse(&text)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }
}
