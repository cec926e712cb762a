//! Configuration loading, validation, and management for draftwright.
//!
//! Loads configuration from `~/.draftwright/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.draftwright/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per backend response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Providers tried in order after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Embedding backend
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Prior-proposal corpus and index location
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Chunker parameters
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Section retrieval parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Section generation and assembly parameters
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "deepseek-r1:14b".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("fallback_providers", &self.fallback_providers)
            .field("providers", &self.providers)
            .field("embedding", &self.embedding)
            .field("corpus", &self.corpus)
            .field("chunking", &self.chunking)
            .field("retrieval", &self.retrieval)
            .field("generation", &self.generation)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    /// Per-call timeout when this provider is part of a fallback chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "hashing" (offline, deterministic) or the name of a configured provider
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model name passed to the embedding provider
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector size of the hashing embedder
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Texts per embedding request during indexing
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_provider() -> String {
    "hashing".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_dimensions() -> usize {
    256
}
fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory of prior proposals in plain text or markdown
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,

    /// JSON snapshot of the passage index
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// File extensions accepted into the corpus
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_corpus_dir() -> PathBuf {
    AppConfig::config_dir().join("corpus")
}
fn default_index_path() -> PathBuf {
    AppConfig::config_dir().join("index").join("passages.json")
}
fn default_extensions() -> Vec<String> {
    vec!["txt".into(), "md".into()]
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            index_path: default_index_path(),
            extensions: default_extensions(),
        }
    }
}

/// Chunk sizes, all in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_size")]
    pub target_size: usize,

    #[serde(default = "default_overlap")]
    pub overlap: usize,

    /// Chunks shorter than this (after trimming) are dropped
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

fn default_target_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}
fn default_min_chars() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_size: default_target_size(),
            overlap: default_overlap(),
            min_chars: default_min_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Precedent passages per section
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Candidates fetched per result before section filtering
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Requirement text included in the retrieval query
    #[serde(default = "default_query_excerpt_chars")]
    pub requirement_excerpt_chars: usize,

    /// Cap on the retrieval context handed to one prompt
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

fn default_top_k() -> usize {
    3
}
fn default_overfetch_factor() -> usize {
    3
}
fn default_query_excerpt_chars() -> usize {
    500
}
fn default_context_chars() -> usize {
    7000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            overfetch_factor: default_overfetch_factor(),
            requirement_excerpt_chars: default_query_excerpt_chars(),
            context_chars: default_context_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Requirement text included in each section prompt
    #[serde(default = "default_requirement_excerpt_chars")]
    pub requirement_excerpt_chars: usize,

    /// How many previously generated sections each prompt sees
    #[serde(default = "default_previous_sections")]
    pub previous_sections: usize,

    /// Per-section cap on previous-section excerpts
    #[serde(default = "default_previous_section_chars")]
    pub previous_section_chars: usize,

    /// Cap on all previous-section excerpts together
    #[serde(default = "default_previous_context_chars")]
    pub previous_context_chars: usize,

    /// Backend timeout for one section; expiry yields a placeholder
    #[serde(default = "default_section_timeout_secs")]
    pub section_timeout_secs: u64,

    /// Document code printed in the title block and footer
    #[serde(default = "default_document_code")]
    pub document_code: String,

    /// Ask the backend to fix documents deterministic repair leaves invalid
    #[serde(default)]
    pub backend_repair: bool,

    /// Proposal text handed to the evaluator
    #[serde(default = "default_evaluation_chars")]
    pub evaluation_chars: usize,
}

fn default_requirement_excerpt_chars() -> usize {
    1000
}
fn default_previous_sections() -> usize {
    2
}
fn default_previous_section_chars() -> usize {
    500
}
fn default_previous_context_chars() -> usize {
    3000
}
fn default_section_timeout_secs() -> u64 {
    180
}
fn default_document_code() -> String {
    "PKS-537 RQ-01".into()
}
fn default_evaluation_chars() -> usize {
    12000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            requirement_excerpt_chars: default_requirement_excerpt_chars(),
            previous_sections: default_previous_sections(),
            previous_section_chars: default_previous_section_chars(),
            previous_context_chars: default_previous_context_chars(),
            section_timeout_secs: default_section_timeout_secs(),
            document_code: default_document_code(),
            backend_repair: false,
            evaluation_chars: default_evaluation_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.draftwright/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `DRAFTWRIGHT_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `DRAFTWRIGHT_*` and API-key environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("DRAFTWRIGHT_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("DRAFTWRIGHT_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("DRAFTWRIGHT_MODEL") {
            self.default_model = model;
        }

        if let Ok(dir) = std::env::var("DRAFTWRIGHT_CORPUS_DIR") {
            self.corpus.dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".draftwright")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let chunking = &self.chunking;
        if chunking.overlap == 0 || chunking.overlap >= chunking.target_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.overlap must satisfy 0 < overlap < target_size (got {} / {})",
                chunking.overlap, chunking.target_size
            )));
        }

        if self.retrieval.top_k == 0 || self.retrieval.overfetch_factor == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k and retrieval.overfetch_factor must be > 0".into(),
            ));
        }

        if self.embedding.batch_size == 0 || self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size and embedding.dimensions must be > 0".into(),
            ));
        }

        if self.generation.section_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "generation.section_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            fallback_providers: Vec::new(),
            providers: HashMap::new(),
            embedding: EmbeddingConfig::default(),
            corpus: CorpusConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.chunking.target_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.context_chars, 7000);
        assert_eq!(config.generation.previous_sections, 2);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.corpus.extensions, config.corpus.extensions);
        assert_eq!(parsed.generation.document_code, config.generation.document_code);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlap_must_be_below_target_size() {
        let config = AppConfig {
            chunking: ChunkingConfig {
                target_size: 200,
                overlap: 200,
                min_chars: 10,
            },
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn zero_overlap_rejected() {
        let config = AppConfig {
            chunking: ChunkingConfig {
                overlap: 0,
                ..ChunkingConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "ollama");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_model = \"llama3.1:8b\"\n\n[chunking]\ntarget_size = 800\n\n[generation]\nbackend_repair = true"
        )
        .unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "llama3.1:8b");
        assert_eq!(config.chunking.target_size, 800);
        assert_eq!(config.chunking.overlap, 200);
        assert!(config.generation.backend_repair);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_temperature = \"hot\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_redacts_api_keys() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("sk-other"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("ollama"));
        assert!(toml_str.contains("[chunking]"));
        assert!(toml_str.contains("PKS-537 RQ-01"));
    }
}
