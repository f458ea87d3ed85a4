use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::services::registry::MAX_LEASE_DURATION;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "DISCOVERY_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// 实例租约时长（秒），同时也是清理周期
    #[serde(default = "default_lease_duration_secs")]
    pub lease_duration_secs: u64,
}

// 环境变量覆盖项，统一使用 DISCOVERY_ 前缀
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    config: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    lease_duration_secs: Option<u64>,
}

// 兼容旧部署使用的无前缀端口变量，优先级低于 DISCOVERY_PORT
#[derive(Debug, Default, Deserialize)]
struct LegacyEnv {
    server_port: Option<u16>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_lease_duration_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            lease_duration_secs: default_lease_duration_secs(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl RegistryConfig {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs)
    }
}

impl EnvOverrides {
    fn merge_legacy(&mut self, legacy: LegacyEnv) {
        if self.port.is_none() {
            self.port = legacy.server_port;
        }
    }
}

impl Config {
    /// 加载配置：`.env` -> 配置文件（可选）-> `DISCOVERY_*` 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        let mut overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        let legacy: LegacyEnv = envy::from_env()?;
        overrides.merge_legacy(legacy);

        let mut config = match overrides.config.as_deref() {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(lease) = overrides.lease_duration_secs {
            self.registry.lease_duration_secs = lease;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.lease_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "registry.lease_duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.registry.lease_duration() > MAX_LEASE_DURATION {
            return Err(ConfigError::Invalid(format!(
                "registry.lease_duration_secs must not exceed {}",
                MAX_LEASE_DURATION.as_secs()
            )));
        }
        if self.server.host.is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".to_string()));
        }
        Ok(())
    }
}
