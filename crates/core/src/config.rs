//! Configuration management for Orbit.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.orbit/config.yaml`, or the path in `ORBIT_CONFIG`)
//! - `.env` file and environment variables
//! - Command-line flags
//!
//! Later sources win. The configuration is workspace-centric: relative paths
//! (such as the vector index directory) resolve against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers understood by the knowledge crate.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "trigram"];

/// LLM providers understood by the llm crate.
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["gemini", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .orbit/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Vector index storage
    pub index: IndexSettings,

    /// Chunker parameters
    pub chunking: ChunkingSettings,

    /// Embedder selection and transport policy
    pub embedding: EmbeddingSettings,

    /// Generator LLM selection and transport policy
    pub llm: LlmSettings,

    /// Retriever parameters
    pub retrieval: RetrievalSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Where the persisted vector index lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexSettings {
    /// Index directory; relative paths resolve against the workspace
    pub path: PathBuf,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./chroma_db"),
        }
    }
}

/// Chunk size and overlap, measured in grapheme clusters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChunkingSettings {
    pub max_length: usize,
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_length: 1000,
            overlap: 200,
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Provider base URL
    pub endpoint: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Attempts after the first failure
    pub max_retries: u32,

    /// Maximum embedding requests in flight during ingestion
    pub concurrency: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            // all-MiniLM-L6-v2 as packaged by Ollama
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: "http://localhost:11434".to_string(),
            timeout_secs: 30,
            max_retries: 3,
            concurrency: 4,
        }
    }
}

/// LLM provider configuration for answer generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider name: "gemini" or "ollama"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint; the provider default is used when absent
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Attempts after the first failure
    pub max_retries: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-flash-latest".to_string(),
            endpoint: None,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            temperature: 0.3,
            max_tokens: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Retriever configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Number of chunks to retrieve per query
    pub top_k: usize,

    /// Minimum cosine similarity for a chunk to count as context
    pub min_relevance_score: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            min_relevance_score: 0.2,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    index: Option<IndexSettings>,
    chunking: Option<ChunkingSettings>,
    embedding: Option<EmbeddingSettings>,
    llm: Option<LlmSettings>,
    retrieval: Option<RetrievalSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            index: IndexSettings::default(),
            chunking: ChunkingSettings::default(),
            embedding: EmbeddingSettings::default(),
            llm: LlmSettings::default(),
            retrieval: RetrievalSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// A `.env` file in the current directory is loaded first, so its values
    /// behave like regular environment variables.
    ///
    /// Environment variables:
    /// - `ORBIT_WORKSPACE`: Override workspace path
    /// - `ORBIT_CONFIG`: Path to config file
    /// - `ORBIT_INDEX_PATH`: Vector index directory
    /// - `ORBIT_LLM_PROVIDER` / `ORBIT_LLM_MODEL`: Generator selection
    /// - `ORBIT_EMBEDDING_PROVIDER` / `ORBIT_EMBEDDING_MODEL`: Embedder selection
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use orbit_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {:?}", config.index_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {:?}", path);
        }

        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using an explicit environment lookup.
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = lookup("ORBIT_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = lookup("ORBIT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        // Validate workspace exists
        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.orbit_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        config.apply_env(lookup);

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(index) = config_file.index {
            result.index = index;
        }
        if let Some(chunking) = config_file.chunking {
            result.chunking = chunking;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("ORBIT_INDEX_PATH") {
            self.index.path = PathBuf::from(path);
        }
        if let Some(provider) = lookup("ORBIT_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Some(model) = lookup("ORBIT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(provider) = lookup("ORBIT_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup("ORBIT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over every other source.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        index_path: Option<PathBuf>,
        llm_provider: Option<String>,
        llm_model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(index_path) = index_path {
            self.index.path = index_path;
        }

        if let Some(provider) = llm_provider {
            self.llm.provider = provider;
        }

        if let Some(model) = llm_model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .orbit directory.
    pub fn orbit_dir(&self) -> PathBuf {
        self.workspace.join(".orbit")
    }

    /// Directory holding prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.orbit_dir().join("prompts")
    }

    /// Absolute location of the vector index directory.
    pub fn index_path(&self) -> PathBuf {
        if self.index.path.is_absolute() {
            self.index.path.clone()
        } else {
            self.workspace.join(&self.index.path)
        }
    }

    /// Resolve the generator API key from its configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration for the active providers.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown LLM provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if self.chunking.max_length == 0 {
            return Err(AppError::Config(
                "chunking.maxLength must be greater than zero".to_string(),
            ));
        }

        if self.chunking.overlap >= self.chunking.max_length {
            return Err(AppError::Config(format!(
                "chunking.overlap ({}) must be smaller than chunking.maxLength ({})",
                self.chunking.overlap, self.chunking.max_length
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.concurrency == 0 {
            return Err(AppError::Config(
                "embedding.concurrency must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AppError::Config(format!(
                "llm.temperature must be within 0.0-2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config(
                "retrieval.topK must be at least 1".to_string(),
            ));
        }

        if self.llm.provider == "gemini" && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.llm.api_key_env
            )));
        }

        Ok(())
    }
}
