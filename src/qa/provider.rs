//! Supported LLM providers and their credentials.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::Error;
use crate::utils::cache_key;

/// External embedding/generation services the adapter can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Cohere,
    OpenAi,
    /// Generation only
    Ai21,
}

impl Provider {
    /// Every supported provider
    pub const ALL: [Provider; 3] = [Provider::Cohere, Provider::OpenAi, Provider::Ai21];

    /// Identifier used in configuration files
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Cohere => "cohere",
            Provider::OpenAi => "openai",
            Provider::Ai21 => "ai21",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Cohere => "Cohere",
            Provider::OpenAi => "OpenAI",
            Provider::Ai21 => "AI21",
        }
    }

    /// Environment variable holding the provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Cohere => "COHERE_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Ai21 => "AI21_API_KEY",
        }
    }

    pub fn supports_embeddings(&self) -> bool {
        !matches!(self, Provider::Ai21)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Cohere => "https://api.cohere.ai",
            Provider::OpenAi => "https://api.openai.com",
            Provider::Ai21 => "https://api.ai21.com",
        }
    }

    pub fn default_embedding_model(&self) -> Option<&'static str> {
        match self {
            Provider::Cohere => Some("embed-multilingual-v2.0"),
            Provider::OpenAi => Some("text-embedding-ada-002"),
            Provider::Ai21 => None,
        }
    }

    pub fn default_generation_model(&self) -> &'static str {
        match self {
            Provider::Cohere => "command",
            Provider::OpenAi => "gpt-3.5-turbo",
            Provider::Ai21 => "j2-ultra",
        }
    }

    /// Context window of a generation model, in tokens
    pub fn context_window(&self, model: &str) -> usize {
        match self {
            Provider::Cohere => 4_096,
            Provider::OpenAi if model.starts_with("gpt-4") => 8_192,
            Provider::OpenAi if model.contains("16k") => 16_384,
            Provider::OpenAi => 4_096,
            Provider::Ai21 => 8_192,
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cohere" => Ok(Provider::Cohere),
            "openai" | "open-ai" | "open_ai" => Ok(Provider::OpenAi),
            "ai21" | "ai21labs" => Ok(Provider::Ai21),
            _ => Err(Error::Configuration(format!(
                "unsupported provider '{}' (supported: cohere, openai, ai21)",
                s.trim()
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A provider together with its credential and optional overrides
#[derive(Debug)]
pub struct ProviderConfig {
    pub provider: Provider,
    api_key: SecretString,
    /// Model override; the provider default for the role is used when unset
    pub model: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: SecretString::from(api_key.into()),
            model: None,
            base_url: None,
        }
    }

    /// Parse the provider from its name; unknown names are configuration errors
    pub fn named(name: &str, api_key: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::new(name.parse()?, api_key))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    pub(crate) fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().trim().is_empty()
    }

    pub(crate) fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    /// Identity of this configuration for `model`; the credential only enters as a digest
    pub(crate) fn fingerprint(&self, model: &str) -> String {
        let key_digest = cache_key([self.api_key()]);
        cache_key([
            self.provider.id(),
            model,
            self.base_url(),
            key_digest.as_str(),
        ])
    }
}

/// Provider used to embed documents and questions
#[derive(Debug)]
pub struct EmbeddingConfig {
    pub provider: ProviderConfig,
}

impl EmbeddingConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self { provider }
    }

    pub fn named(name: &str, api_key: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::new(ProviderConfig::named(name, api_key)?))
    }
}

/// Provider used to generate answers, plus sampling settings
#[derive(Debug)]
pub struct GenerationConfig {
    pub provider: ProviderConfig,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl GenerationConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            max_output_tokens: 256,
            temperature: 0.0,
        }
    }

    pub fn named(name: &str, api_key: impl Into<String>) -> Result<Self, Error> {
        Ok(Self::new(ProviderConfig::named(name, api_key)?))
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Pick embedding and generation providers from configuration.
///
/// Explicit provider names win. Otherwise OpenAI is used for both roles when
/// an OpenAI key is available, and Cohere embeddings with AI21 generation when
/// it is not.
pub fn select_providers(config: &Config) -> Result<(EmbeddingConfig, GenerationConfig), Error> {
    let llm = &config.llm;
    let has_openai = config.api_keys.openai.is_some();

    let embedding_provider = match &llm.embedding_provider {
        Some(name) => name.parse()?,
        None if has_openai => Provider::OpenAi,
        None => Provider::Cohere,
    };
    let generation_provider = match &llm.generation_provider {
        Some(name) => name.parse()?,
        None if has_openai => Provider::OpenAi,
        None => Provider::Ai21,
    };

    let mut embedding = provider_config(config, embedding_provider)?;
    if let Some(model) = &llm.embedding_model {
        embedding = embedding.with_model(model);
    }

    let mut generation = provider_config(config, generation_provider)?;
    if let Some(model) = &llm.generation_model {
        generation = generation.with_model(model);
    }

    tracing::debug!(
        "Selected providers: embeddings={}, generation={}",
        embedding_provider,
        generation_provider
    );

    Ok((
        EmbeddingConfig::new(embedding),
        GenerationConfig::new(generation)
            .max_output_tokens(llm.max_output_tokens)
            .temperature(llm.temperature),
    ))
}

fn provider_config(config: &Config, provider: Provider) -> Result<ProviderConfig, Error> {
    let (key, base_url) = match provider {
        Provider::Cohere => (&config.api_keys.cohere, &config.endpoints.cohere_base),
        Provider::OpenAi => (&config.api_keys.openai, &config.endpoints.openai_base),
        Provider::Ai21 => (&config.api_keys.ai21, &config.endpoints.ai21_base),
    };

    let key = key.as_deref().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
        Error::Configuration(format!(
            "no API key configured for {} (set {})",
            provider,
            provider.api_key_env()
        ))
    })?;

    let mut provider_config = ProviderConfig::new(provider, key);
    if let Some(base_url) = base_url {
        provider_config = provider_config.with_base_url(base_url);
    }
    Ok(provider_config)
}
