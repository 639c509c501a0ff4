//! Configuration management.
//!
//! Configuration is read from a TOML file and layered with environment
//! variables prefixed `PDB_GPT` (nested keys separated by `__`, e.g.
//! `PDB_GPT_LLM__TOP_K=6`).
//!
//! ```toml
//! [endpoints]
//! pdbe_base = "https://www.ebi.ac.uk/pdbe/api/pdb/entry/publications"
//! rcsb_base = "https://data.rcsb.org/rest/v1/core"
//!
//! [http]
//! timeout_seconds = 30
//!
//! [api_keys]
//! cohere = "..."
//! ai21 = "..."
//!
//! [llm]
//! embedding_provider = "cohere"
//! generation_provider = "ai21"
//! top_k = 4
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service base URLs
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// API keys for LLM providers
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Question-answering settings
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Base URLs for metadata services and LLM providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// PDBe publications-by-entry service
    #[serde(default = "default_pdbe_base")]
    pub pdbe_base: String,

    /// RCSB Data API (core)
    #[serde(default = "default_rcsb_base")]
    pub rcsb_base: String,

    /// Cohere API
    #[serde(default)]
    pub cohere_base: Option<String>,

    /// OpenAI API
    #[serde(default)]
    pub openai_base: Option<String>,

    /// AI21 Studio API
    #[serde(default)]
    pub ai21_base: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            pdbe_base: default_pdbe_base(),
            rcsb_base: default_rcsb_base(),
            cohere_base: None,
            openai_base: None,
            ai21_base: None,
        }
    }
}

fn default_pdbe_base() -> String {
    "https://www.ebi.ac.uk/pdbe/api/pdb/entry/publications".to_string()
}

fn default_rcsb_base() -> String {
    "https://data.rcsb.org/rest/v1/core".to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Whole-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection establishment timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

/// API keys for LLM providers
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// OpenAI API key; when present OpenAI is used for embeddings and generation
    #[serde(default = "env_openai_key")]
    pub openai: Option<String>,

    /// Cohere API key
    #[serde(default = "env_cohere_key")]
    pub cohere: Option<String>,

    /// AI21 Studio API key
    #[serde(default = "env_ai21_key")]
    pub ai21: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            openai: env_openai_key(),
            cohere: env_cohere_key(),
            ai21: env_ai21_key(),
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(key: &Option<String>) -> &'static str {
            if key.is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("ApiKeys")
            .field("openai", &redact(&self.openai))
            .field("cohere", &redact(&self.cohere))
            .field("ai21", &redact(&self.ai21))
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_openai_key() -> Option<String> {
    non_empty_env("OPENAI_API_KEY")
}

fn env_cohere_key() -> Option<String> {
    non_empty_env("COHERE_API_KEY")
}

fn env_ai21_key() -> Option<String> {
    non_empty_env("AI21_API_KEY")
}

/// Question-answering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Embedding provider name (`cohere` or `openai`); chosen from the keys when unset
    #[serde(default)]
    pub embedding_provider: Option<String>,

    /// Generation provider name (`cohere`, `openai` or `ai21`); chosen from the keys when unset
    #[serde(default)]
    pub generation_provider: Option<String>,

    /// Embedding model override
    #[serde(default)]
    pub embedding_model: Option<String>,

    /// Generation model override
    #[serde(default)]
    pub generation_model: Option<String>,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum chunk length in words
    #[serde(default = "default_chunk_size")]
    pub chunk_size_words: usize,

    /// Words shared between consecutive chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap_words: usize,

    /// Maximum tokens generated per completion
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            embedding_provider: None,
            generation_provider: None,
            embedding_model: None,
            generation_model: None,
            top_k: default_top_k(),
            chunk_size_words: default_chunk_size(),
            chunk_overlap_words: default_chunk_overlap(),
            max_output_tokens: default_max_output_tokens(),
            temperature: 0.0,
        }
    }
}

fn default_top_k() -> usize {
    4
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    20
}

fn default_max_output_tokens() -> u32 {
    256
}

/// Load configuration from a file, layered with `PDB_GPT_*` environment variables
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    build_config(Some(path))
}

/// Configuration from `PDB_GPT_*` environment variables and defaults only
pub fn get_config() -> Result<Config, config::ConfigError> {
    build_config(None)
}

fn build_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    builder
        .add_source(
            config::Environment::with_prefix("PDB_GPT")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

/// Find a configuration file in the default locations.
///
/// Checks `./pdb-gpt.toml`, then `<config dir>/pdb-gpt/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("pdb-gpt.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("pdb-gpt").join("config.toml"))
        .filter(|path| path.is_file())
}
