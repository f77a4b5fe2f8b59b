/// Configuration management for coro

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main coro configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fleet configuration
    pub fleet: FleetConfig,
    /// Stream playback configuration
    pub stream: StreamConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Fleet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Worker nodes, one per bot credential
    pub nodes: Vec<NodeConfig>,
    /// Leadership re-election sweep interval in seconds
    pub health_check_interval_sec: u64,
}

/// A single worker node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name; generated when omitted
    pub name: Option<String>,
    /// Bot credential token
    pub token: String,
}

/// Stream playback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Loop source played continuously
    pub source_url: String,
    /// Volume applied before a guild persists its own setting
    pub default_volume: u32,
    /// Delay before reconnecting after an involuntary disconnect, in seconds
    pub reconnect_delay_sec: u64,
    /// Delay after node ready before the fleet-wide reconnect pass, in seconds
    pub ready_reconnect_delay_sec: u64,
    /// Delay before retrying a failed stream load, in seconds
    pub retry_delay_sec: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
    /// Log to stdout
    pub stdout: bool,
    /// Log file path (optional)
    pub file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fleet: FleetConfig {
                nodes: vec![NodeConfig {
                    name: Some("coro-1".to_string()),
                    token: "REPLACE_WITH_BOT_TOKEN".to_string(),
                }],
                health_check_interval_sec: 30,
            },
            stream: StreamConfig {
                source_url: "https://lofi4u.com/api/stream/live".to_string(),
                default_volume: 50,
                reconnect_delay_sec: 2,
                ready_reconnect_delay_sec: 5,
                retry_delay_sec: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                stdout: true,
                file: None,
            },
        }
    }
}

impl FleetConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_sec)
    }
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_sec)
    }

    pub fn ready_reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.ready_reconnect_delay_sec)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_sec)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate fleet config
        if self.fleet.nodes.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one fleet node is required".to_string(),
            ));
        }

        if self.fleet.health_check_interval_sec == 0 {
            return Err(ConfigError::ValidationError(
                "health_check_interval_sec must be greater than 0".to_string(),
            ));
        }

        let mut seen_names = std::collections::HashSet::new();
        for node in &self.fleet.nodes {
            validate_token(&node.token)?;

            if let Some(name) = &node.name {
                if name.trim().is_empty() {
                    return Err(ConfigError::ValidationError(
                        "node name cannot be blank".to_string(),
                    ));
                }
                if !seen_names.insert(name.clone()) {
                    return Err(ConfigError::ValidationError(format!(
                        "duplicate node name: {}",
                        name
                    )));
                }
            }
        }

        // Validate stream config
        if self.stream.source_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "stream source_url cannot be empty".to_string(),
            ));
        }

        if self.stream.default_volume > 100 {
            return Err(ConfigError::ValidationError(
                "default_volume must be in 0..=100".to_string(),
            ));
        }

        if self.stream.reconnect_delay_sec == 0
            || self.stream.ready_reconnect_delay_sec == 0
            || self.stream.retry_delay_sec == 0
        {
            return Err(ConfigError::ValidationError(
                "stream delays must be greater than 0".to_string(),
            ));
        }

        // Validate logging config
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log level: {}", self.logging.level)
            )),
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log format: {}", self.logging.format)
            )),
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let config = Config {
            fleet: FleetConfig {
                nodes: vec![
                    NodeConfig {
                        name: Some("coro-1".to_string()),
                        token: "FIRST_BOT_TOKEN".to_string(),
                    },
                    NodeConfig {
                        name: Some("coro-2".to_string()),
                        token: "SECOND_BOT_TOKEN".to_string(),
                    },
                    NodeConfig {
                        name: None,
                        token: "THIRD_BOT_TOKEN".to_string(),
                    },
                ],
                health_check_interval_sec: 30,
            },
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

/// Token must be present and free of whitespace; the platform rejects
/// anything else before the gateway even connects.
fn validate_token(token: &str) -> Result<(), ConfigError> {
    if token.is_empty() {
        return Err(ConfigError::ValidationError(
            "node token cannot be empty".to_string(),
        ));
    }

    if token.chars().any(char::is_whitespace) {
        return Err(ConfigError::ValidationError(
            "node token cannot contain whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
