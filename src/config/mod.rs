//! Configuration management for marksearch
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bookmark service connection
    #[serde(default)]
    pub bookmarks: BookmarksConfig,

    /// Qdrant connection
    #[serde(default)]
    pub qdrant: QdrantConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Background sync configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Bookmark service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarksConfig {
    /// Base URL of the bookmark service
    #[serde(default = "default_bookmarks_url")]
    pub url: String,

    /// Environment variable name holding the API key
    #[serde(default = "default_bookmarks_api_key_env")]
    pub api_key_env: String,
}

/// Qdrant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Collection name
    #[serde(default = "default_collection_name")]
    pub collection: String,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider: "openai" (any OpenAI-compatible API) or "local" (fastembed)
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension; 0 means derive from the model name
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Base URL for the OpenAI-compatible API
    #[serde(default = "default_embedding_api_base")]
    pub api_base: String,

    /// Environment variable name holding the embedding API key
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,
}

/// Background sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minutes between background incremental syncs
    #[serde(default = "default_sync_interval_minutes")]
    pub interval_minutes: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// Lookup the expected embedding dimension for a known model
pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    match model {
        "BAAI/bge-small-en-v1.5" => Some(384),
        "BAAI/bge-base-en-v1.5" => Some(768),
        "BAAI/bge-large-en-v1.5" => Some(1024),
        "sentence-transformers/all-MiniLM-L6-v2" => Some(384),
        "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        "nomic-embed-text" => Some(768),
        "mxbai-embed-large" => Some(1024),
        _ => None,
    }
}

impl EmbeddingConfig {
    /// Resolve the effective embedding dimension based on the configured model
    pub fn resolved_dimension(&self) -> Result<usize> {
        if let Some(expected) = embedding_dimension_for_model(&self.model) {
            return Ok(expected);
        }
        if self.dimension == 0 {
            return Err(Error::Config(format!(
                "Unknown embedding model '{}'; set embedding.dimension explicitly",
                self.model
            )));
        }
        Ok(self.dimension)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bookmarks: BookmarksConfig::default(),
            qdrant: QdrantConfig::default(),
            embedding: EmbeddingConfig::default(),
            sync: SyncConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for BookmarksConfig {
    fn default() -> Self {
        Self {
            url: default_bookmarks_url(),
            api_key_env: default_bookmarks_api_key_env(),
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection_name(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            api_base: default_embedding_api_base(),
            api_key_env: default_embedding_api_key_env(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_sync_interval_minutes(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

impl Config {
    /// Get the default base directory for marksearch (~/.marksearch)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".marksearch")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location, falling back to defaults
    /// when no config file exists
    pub fn load_default() -> Result<Self> {
        let path = Self::default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No config file found, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Save configuration to a file
    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Get the bookmark service API key from environment
    pub fn bookmarks_api_key(&self) -> Option<String> {
        std::env::var(&self.bookmarks.api_key_env).ok()
    }

    /// Get the embedding API key from environment
    pub fn embedding_api_key(&self) -> Option<String> {
        std::env::var(&self.embedding.api_key_env).ok()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        match self.embedding.provider.as_str() {
            "openai" | "local" => {}
            other => {
                return Err(Error::Config(format!(
                    "Unsupported embedding provider '{}'; expected 'openai' or 'local'",
                    other
                )));
            }
        }

        if self.sync.interval_minutes == 0 {
            return Err(Error::Config(
                "sync.interval_minutes must be positive".to_string(),
            ));
        }

        self.embedding.resolved_dimension()?;

        Ok(())
    }
}
