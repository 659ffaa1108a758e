//! Configuration management for querycase
//!
//! Loads, validates, and saves the TOML configuration that drives the
//! fetch/ingest pipeline and search defaults.

use crate::error::{QuerycaseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub search: SearchConfig,
}

/// Upstream document API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base endpoint for the paginated opinions listing
    pub base_url: String,
    /// Name of the environment variable holding the API token (never the token itself)
    pub auth_token_env: String,
    /// Court filter passed as `court__contains` on the first request
    pub court: String,
    /// Server-side page size
    pub page_size: usize,
    pub user_agent: String,
}

/// Local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Fetch loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Documents per yielded batch
    pub batch_size: usize,
    /// Minimum extracted-text length accepted at fetch time
    pub min_text_chars: usize,
    /// Checkpoint default when no checkpoint exists (YYYY-MM-DD)
    pub date_floor: String,
    /// Timeout applied to every network call, in seconds
    pub request_timeout_secs: u64,
    /// Delay before retrying a failed page fetch, in seconds
    pub retry_backoff_secs: u64,
    /// Polite delay between per-item downloads, in milliseconds
    pub polite_delay_ms: u64,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub vector_dim: usize,
    /// Words per chunk fed to the embedder
    pub chunk_max_words: usize,
    /// Minimum full-text length embedded at indexing time (looser than fetch gating)
    pub min_index_chars: usize,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub snippet_chars: usize,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuerycaseError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| QuerycaseError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: QUERYCASE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("QUERYCASE_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "API__BASE_URL" => {
                self.api.base_url = value.to_string();
            }
            "API__COURT" => {
                self.api.court = value.to_string();
            }
            "STORAGE__DATA_DIR" => {
                self.storage.data_dir = PathBuf::from(value);
            }
            "FETCH__BATCH_SIZE" => {
                self.fetch.batch_size =
                    value.parse().map_err(|_| QuerycaseError::InvalidConfigValue {
                        path: path.to_string(),
                        message: format!("Cannot parse '{}' as integer", value),
                    })?;
            }
            "EMBEDDING__MODEL" => {
                self.embedding.model = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Sanity checks on values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.fetch.batch_size == 0 {
            return Err(QuerycaseError::InvalidConfigValue {
                path: "fetch.batch_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.index.chunk_max_words == 0 {
            return Err(QuerycaseError::InvalidConfigValue {
                path: "index.chunk_max_words".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.index.vector_dim == 0 {
            return Err(QuerycaseError::InvalidConfigValue {
                path: "index.vector_dim".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if chrono::NaiveDate::parse_from_str(&self.fetch.date_floor, "%Y-%m-%d").is_err() {
            return Err(QuerycaseError::InvalidConfigValue {
                path: "fetch.date_floor".to_string(),
                message: format!("'{}' is not a YYYY-MM-DD date", self.fetch.date_floor),
            });
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            QuerycaseError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("querycase").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| QuerycaseError::Config("Cannot determine home directory".to_string()))?;

        Ok(home_dir.join(".querycase").join("data"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://www.courtlistener.com/api/rest/v4/opinions/".to_string(),
                auth_token_env: "COURTLISTENER_API_TOKEN".to_string(),
                court: "ca".to_string(),
                page_size: 5,
                user_agent: "querycase/0.1".to_string(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.querycase/data"),
            },
            fetch: FetchConfig {
                batch_size: 50,
                min_text_chars: 200,
                date_floor: "2022-01-01".to_string(),
                request_timeout_secs: 30,
                retry_backoff_secs: 60,
                polite_delay_ms: 1000,
            },
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
            },
            index: IndexConfig {
                vector_dim: 384,
                chunk_max_words: 200,
                min_index_chars: 100,
            },
            search: SearchConfig {
                top_k: 5,
                snippet_chars: 500,
            },
        }
    }
}
