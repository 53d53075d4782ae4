//! Configuration loading and resolution
//!
//! Values resolve with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (handled by clap `env` attributes in the binary)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default listen port for the front-end service
pub const DEFAULT_PORT: u16 = 5730;

/// Default base URL of the vision-processing backend
pub const DEFAULT_VISION_BASE_URL: &str = "http://localhost:5001";

/// Default status poll period in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default automatic start-retry ceiling
pub const DEFAULT_MAX_START_ATTEMPTS: u32 = 3;

/// Default points awarded for a qualifying comparison action
pub const DEFAULT_COMPARE_REWARD_POINTS: i64 = 10;

/// Service configuration, loaded from a TOML file with compiled fallbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Port the HTTP API listens on
    pub port: u16,
    /// Base URL of the vision-processing backend
    pub vision_base_url: String,
    /// Base URL of the hosted row-store (PostgREST-style endpoint)
    pub store_base_url: String,
    /// API key for the row-store
    pub store_api_key: String,
    /// Status poll period in milliseconds
    pub poll_interval_ms: u64,
    /// Automatic start-retry ceiling before an explicit reset is required
    pub max_start_attempts: u32,
    /// Points awarded per qualifying comparison action
    pub compare_reward_points: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            vision_base_url: DEFAULT_VISION_BASE_URL.to_string(),
            store_base_url: String::new(),
            store_api_key: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_start_attempts: DEFAULT_MAX_START_ATTEMPTS,
            compare_reward_points: DEFAULT_COMPARE_REWARD_POINTS,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from an explicit path or the platform default location
    ///
    /// A missing file at the default location is not an error: the compiled
    /// defaults are used and a warning is logged. A missing file at an
    /// explicitly requested path is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => match default_config_file() {
                Some(p) => p,
                None => {
                    warn!("No config file found, using compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config: ServiceConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

        info!("Configuration loaded from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line / environment overrides on top of TOML values
    ///
    /// Warns when an override shadows a value the config file also sets,
    /// to surface potential misconfiguration.
    pub fn apply_overrides(
        &mut self,
        port: Option<u16>,
        vision_base_url: Option<String>,
        store_base_url: Option<String>,
        store_api_key: Option<String>,
    ) {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(url) = vision_base_url {
            if self.vision_base_url != DEFAULT_VISION_BASE_URL && self.vision_base_url != url {
                warn!(
                    "Vision backend URL set in both config file and CLI/environment. \
                     Using CLI/environment (highest priority)."
                );
            }
            self.vision_base_url = url;
        }
        if let Some(url) = store_base_url {
            if !self.store_base_url.is_empty() && self.store_base_url != url {
                warn!(
                    "Row-store URL set in both config file and CLI/environment. \
                     Using CLI/environment (highest priority)."
                );
            }
            self.store_base_url = url;
        }
        if let Some(key) = store_api_key {
            self.store_api_key = key;
        }
    }

    /// Validate loaded values, falling back with a warning where safe
    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_start_attempts == 0 {
            return Err(Error::Config(
                "max_start_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Find the configuration file at the platform default location
///
/// Linux: `~/.config/shelfaware/config.toml`, then `/etc/shelfaware/config.toml`.
/// macOS/Windows: the user config directory.
pub fn default_config_file() -> Option<PathBuf> {
    if cfg!(target_os = "linux") {
        if let Some(path) = dirs::config_dir().map(|d| d.join("shelfaware").join("config.toml")) {
            if path.exists() {
                return Some(path);
            }
        }
        let system_config = PathBuf::from("/etc/shelfaware/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
        None
    } else {
        dirs::config_dir()
            .map(|d| d.join("shelfaware").join("config.toml"))
            .filter(|p| p.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.vision_base_url, DEFAULT_VISION_BASE_URL);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.max_start_attempts, 3);
    }

    #[test]
    fn overrides_take_priority() {
        let mut config = ServiceConfig::default();
        config.apply_overrides(
            Some(8080),
            Some("http://vision:5001".to_string()),
            Some("https://store.example.com".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.vision_base_url, "http://vision:5001");
        assert_eq!(config.store_base_url, "https://store.example.com");
        assert_eq!(config.store_api_key, "secret");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = ServiceConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
