//! stateboard.toml configuration.
//!
//! Every section is optional and falls back to its `Default`. The shared
//! secret has no default and must come from the file, the CLI, or the
//! environment before [`StateboardConfig::validate`] passes.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateboardConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub limits: LimitsConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    /// Reported by the health endpoint.
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8787)),
            service_name: "stateboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    /// Custom header checked alongside `Authorization: Bearer`.
    pub header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            header: "x-api-key".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub default_list_limit: usize,
    pub max_list_limit: usize,
    /// Upper bound on entities read by one `/stats` call.
    pub stats_scan_limit: usize,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            default_list_limit: 100,
            max_list_limit: 1000,
            stats_scan_limit: 1000,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl LimitsConfig {
    /// Resolve a raw `limit` query value: unparsable falls back to the
    /// default, anything else is clamped to `1..=max_list_limit`.
    pub fn resolve_list_limit(&self, raw: Option<&str>) -> usize {
        raw.and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(self.default_list_limit)
            .clamp(1, self.max_list_limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/stateboard"),
            in_memory: false,
        }
    }
}

impl StoreConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("stateboard.redb")
    }
}

impl StateboardConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.api_key.as_deref() {
            None => return Err(ConfigError::Invalid("auth.api_key is not set".into())),
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::Invalid("auth.api_key is empty".into()));
            }
            Some(_) => {}
        }
        if self.auth.header.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.header is empty".into()));
        }

        let limits = &self.limits;
        if limits.max_list_limit == 0 || limits.stats_scan_limit == 0 || limits.max_body_bytes == 0
        {
            return Err(ConfigError::Invalid("limits must be greater than zero".into()));
        }
        if limits.default_list_limit == 0 || limits.default_list_limit > limits.max_list_limit {
            return Err(ConfigError::Invalid(format!(
                "default_list_limit {} must be within 1..={}",
                limits.default_list_limit, limits.max_list_limit
            )));
        }
        Ok(())
    }
}
