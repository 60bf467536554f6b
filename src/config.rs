//! Configuration for docrelay
//!
//! Settings are grouped per concern. Every group has working defaults, so an
//! empty JSON object (or no config file at all) is a valid configuration.

use crate::error::{DocrelayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding [`StorageConfig::database_path`]
pub const ENV_DATABASE: &str = "DOCRELAY_DATABASE";

/// Environment variable overriding [`WebhookConfig::url`]
pub const ENV_WEBHOOK_URL: &str = "DOCRELAY_WEBHOOK_URL";

/// Environment variable overriding [`WebhookConfig::timeout_secs`]
pub const ENV_WEBHOOK_TIMEOUT: &str = "DOCRELAY_WEBHOOK_TIMEOUT_SECS";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub storage: StorageConfig,
    pub webhook: WebhookConfig,
}

/// Chunking settings used at ingestion time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive windows, must be below `chunk_size`
    pub overlap: usize,

    /// Maximum number of chunks written per storage transaction
    pub insert_batch_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            overlap: 200,
            insert_batch_size: 100,
        }
    }
}

impl ChunkingConfig {
    /// Check that the window settings guarantee forward progress
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DocrelayError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(DocrelayError::Config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        if self.insert_batch_size == 0 {
            return Err(DocrelayError::Config(
                "insert_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keyword retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks returned per query when the caller does not ask for a number
    pub top_k: usize,

    /// Shortest query word, in characters, that counts as a keyword
    pub min_token_len: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 12,
            min_token_len: 4,
        }
    }
}

/// Chunk storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the SQLite database file
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "docrelay.db".to_string(),
        }
    }
}

/// Workflow webhook settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebhookConfig {
    /// Endpoint receiving chat messages; `None` means context-only replies
    pub url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DocrelayError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE) {
            self.storage.database_path = path;
        }
        if let Some(url) = lookup(ENV_WEBHOOK_URL) {
            let url = url.trim().to_string();
            self.webhook.url = if url.is_empty() { None } else { Some(url) };
        }
        if let Some(timeout) = lookup(ENV_WEBHOOK_TIMEOUT) {
            self.webhook.timeout_secs = timeout.trim().parse().map_err(|_| {
                DocrelayError::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_WEBHOOK_TIMEOUT, timeout
                ))
            })?;
        }
        Ok(())
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.retrieval.top_k == 0 {
            return Err(DocrelayError::Config(
                "retrieval.top_k must be greater than zero".to_string(),
            ));
        }
        if self.retrieval.min_token_len == 0 {
            return Err(DocrelayError::Config(
                "retrieval.min_token_len must be greater than zero".to_string(),
            ));
        }
        if self.webhook.timeout_secs == 0 {
            return Err(DocrelayError::Config(
                "webhook.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if let Some(url) = &self.webhook.url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DocrelayError::Config(format!(
                    "webhook.url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        Ok(())
    }
}
