//! Run configuration
//!
//! JSON file with a `rag` and an `llm` section. Every field has a default,
//! so a missing file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::documents::chunker::{validate_window, ChunkerError, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::documents::embeddings::{DEFAULT_EMBEDDING_DIM, HASHING_MODEL_ID};

/// Application directory name under the platform config dir
const APP_IDENTIFIER: &str = "skillscope";

/// Upper bound for `top_k`
pub const MAX_TOP_K: usize = 50;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid chunk window: {0}")]
    Window(#[from] ChunkerError),
    #[error("top_k must be between 1 and {}, got {0}", MAX_TOP_K)]
    TopK(usize),
    #[error("Embedding dimension must be positive")]
    ZeroDimension,
    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),
    #[error("Config directory not found")]
    NoConfigDir,
}

impl Serialize for ConfigError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Chunking, embedding and retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub overlap: usize,
    pub top_k: usize,
    pub embedding_model: String,
    pub embedding_dim: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            top_k: 5,
            embedding_model: HASHING_MODEL_ID.to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

/// Chat-completions endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key; the key itself never lives in the file
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama3-8b-8192".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 1500,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillscopeConfig {
    pub rag: RagConfig,
    pub llm: LlmConfig,
}

impl SkillscopeConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&default_config_path()?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rag = &self.rag;
        validate_window(rag.chunk_size, rag.overlap)?;
        if rag.top_k == 0 || rag.top_k > MAX_TOP_K {
            return Err(ConfigError::TopK(rag.top_k));
        }
        if rag.embedding_dim == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if rag.embedding_model != HASHING_MODEL_ID {
            return Err(ConfigError::UnknownModel(rag.embedding_model.clone()));
        }
        Ok(())
    }
}

/// `<config_dir>/skillscope/config.json`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_IDENTIFIER).join("config.json"))
}
