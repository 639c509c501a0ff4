//! Question-answering engine over an ephemeral vector index.

use std::sync::Arc;

use crate::config::{Config, LlmConfig};
use crate::error::Error;
use crate::qa::client::{GenerationParams, ProviderClient};
use crate::qa::index::{Chunker, VectorIndex};
use crate::qa::provider::{select_providers, EmbeddingConfig, GenerationConfig};
use crate::qa::synthesize::{context_budget_chars, tree_summarize, EMPTY_RESPONSE};
use crate::utils::{cache_key, HttpClient};

/// Chunking and retrieval settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// Chunks handed to synthesis per question
    pub top_k: usize,
    pub chunk_size_words: usize,
    pub chunk_overlap_words: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            chunk_size_words: 512,
            chunk_overlap_words: 20,
        }
    }
}

impl From<&LlmConfig> for RetrievalSettings {
    fn from(llm: &LlmConfig) -> Self {
        Self {
            top_k: llm.top_k,
            chunk_size_words: llm.chunk_size_words,
            chunk_overlap_words: llm.chunk_overlap_words,
        }
    }
}

/// An embedding provider and a generation provider, validated and ready to index
#[derive(Debug, Clone)]
pub struct QaEngine {
    embedder: Arc<ProviderClient>,
    generator: Arc<ProviderClient>,
    params: GenerationParams,
    settings: RetrievalSettings,
    fingerprint: String,
}

impl QaEngine {
    /// Validate the provider configurations and build an engine.
    ///
    /// Fails with [`Error::Configuration`] if the embedding provider cannot
    /// embed or either credential is blank. No request is made.
    pub fn new(embedding: EmbeddingConfig, generation: GenerationConfig) -> Result<Self, Error> {
        Self::with_http(embedding, generation, HttpClient::new()?)
    }

    /// Like [`QaEngine::new`] with an explicit HTTP client
    pub fn with_http(
        embedding: EmbeddingConfig,
        generation: GenerationConfig,
        http: HttpClient,
    ) -> Result<Self, Error> {
        validate(&embedding, &generation)?;

        let embedding_provider = embedding.provider.provider;
        let embedding_model = match embedding.provider.model.clone() {
            Some(model) => model,
            None => embedding_provider
                .default_embedding_model()
                .map(String::from)
                .ok_or_else(|| unsupported_embeddings(embedding_provider.name()))?,
        };
        let generation_model = generation
            .provider
            .model
            .clone()
            .unwrap_or_else(|| generation.provider.provider.default_generation_model().to_string());

        let params = GenerationParams {
            max_output_tokens: generation.max_output_tokens,
            temperature: generation.temperature,
        };
        let embedder = ProviderClient::new(embedding.provider, embedding_model, http.clone());
        let generator = ProviderClient::new(generation.provider, generation_model, http);
        let settings = RetrievalSettings::default();
        let fingerprint = engine_fingerprint(&embedder, &generator, params, settings);

        tracing::debug!(
            "Created engine: embeddings={}/{}, generation={}/{}",
            embedder.provider(),
            embedder.model(),
            generator.provider(),
            generator.model()
        );

        Ok(Self {
            embedder: Arc::new(embedder),
            generator: Arc::new(generator),
            params,
            settings,
            fingerprint,
        })
    }

    /// Engine for the providers, HTTP settings and retrieval settings in `config`
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let (embedding, generation) = select_providers(config)?;
        let http = HttpClient::from_config(&config.http)?;
        Self::with_http(embedding, generation, http)?
            .with_settings(RetrievalSettings::from(&config.llm))
    }

    /// Replace the retrieval settings; `top_k` must be at least 1
    pub fn with_settings(mut self, settings: RetrievalSettings) -> Result<Self, Error> {
        if settings.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".to_string()));
        }
        if settings.chunk_size_words == 0 {
            return Err(Error::Configuration(
                "chunk_size_words must be at least 1".to_string(),
            ));
        }
        self.settings = settings;
        self.fingerprint = engine_fingerprint(&self.embedder, &self.generator, self.params, settings);
        Ok(self)
    }

    pub fn settings(&self) -> RetrievalSettings {
        self.settings
    }

    /// Stable identity of the providers, models, credentials and settings
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Chunk and embed `snippets`, one document per snippet.
    ///
    /// An empty (or all-blank) snippet list produces an engine with an empty
    /// index without contacting the embedding provider.
    pub async fn build_index(&self, snippets: &[String]) -> Result<IndexedEngine, Error> {
        let chunker = Chunker::new(
            self.settings.chunk_size_words,
            self.settings.chunk_overlap_words,
        );
        let chunks: Vec<String> = snippets.iter().flat_map(|s| chunker.chunk(s)).collect();

        let index = if chunks.is_empty() {
            tracing::debug!("No context to index");
            VectorIndex::new()
        } else {
            let embeddings = self.embedder.embed(&chunks).await?;
            VectorIndex::from_parts(chunks, embeddings).ok_or_else(|| Error::TransientProvider {
                provider: self.embedder.provider().name().to_string(),
                message: "embedding count does not match chunk count".to_string(),
            })?
        };

        tracing::info!(
            "Indexed {} snippet(s) as {} chunk(s)",
            snippets.len(),
            index.len()
        );

        Ok(IndexedEngine {
            id: index_id(&self.fingerprint, snippets),
            engine: self.clone(),
            index,
        })
    }
}

/// An engine together with the index built from one context selection
#[derive(Debug, Clone)]
pub struct IndexedEngine {
    engine: QaEngine,
    index: VectorIndex,
    id: String,
}

impl IndexedEngine {
    /// Digest of the engine fingerprint and the indexed snippets
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn engine(&self) -> &QaEngine {
        &self.engine
    }

    /// Answer a question from the indexed context.
    ///
    /// A blank question fails with [`Error::InvalidQuestion`]. An empty index
    /// answers [`EMPTY_RESPONSE`] without any request.
    pub async fn query(&self, question: &str) -> Result<String, Error> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidQuestion);
        }
        if self.index.is_empty() {
            return Ok(EMPTY_RESPONSE.to_string());
        }

        let engine = &self.engine;
        let query_embedding = engine
            .embedder
            .embed(&[question.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::TransientProvider {
                provider: engine.embedder.provider().name().to_string(),
                message: "no embedding returned for question".to_string(),
            })?;

        let hits = self.index.top_k(&query_embedding, engine.settings.top_k);
        tracing::debug!(
            "Retrieved {} chunk(s), best score {:.3}",
            hits.len(),
            hits.first().map(|h| h.score).unwrap_or_default()
        );
        let texts: Vec<String> = hits.iter().map(|h| h.text.to_string()).collect();

        let generator = &engine.generator;
        let budget = context_budget_chars(
            generator.provider().context_window(generator.model()),
            engine.params.max_output_tokens,
            question,
        );
        let answer = tree_summarize(generator, engine.params, question, texts, budget).await?;

        Ok(answer.trim().to_string())
    }
}

fn unsupported_embeddings(provider: &str) -> Error {
    Error::Configuration(format!("{} does not provide embeddings", provider))
}

fn validate(embedding: &EmbeddingConfig, generation: &GenerationConfig) -> Result<(), Error> {
    let embedding_provider = embedding.provider.provider;
    if !embedding_provider.supports_embeddings() {
        return Err(unsupported_embeddings(embedding_provider.name()));
    }
    for config in [&embedding.provider, &generation.provider] {
        if !config.has_api_key() {
            return Err(Error::Configuration(format!(
                "API key for {} is blank (set {})",
                config.provider,
                config.provider.api_key_env()
            )));
        }
    }
    Ok(())
}

fn engine_fingerprint(
    embedder: &ProviderClient,
    generator: &ProviderClient,
    params: GenerationParams,
    settings: RetrievalSettings,
) -> String {
    cache_key([
        embedder.fingerprint(),
        generator.fingerprint(),
        format!("{}:{}", params.max_output_tokens, params.temperature),
        format!(
            "{}:{}:{}",
            settings.top_k, settings.chunk_size_words, settings.chunk_overlap_words
        ),
    ])
}

fn index_id(fingerprint: &str, snippets: &[String]) -> String {
    cache_key(std::iter::once(fingerprint).chain(snippets.iter().map(String::as_str)))
}

/// Validate provider configurations and build an engine; see [`QaEngine::new`]
pub fn create_engine(
    embedding: EmbeddingConfig,
    generation: GenerationConfig,
) -> Result<QaEngine, Error> {
    QaEngine::new(embedding, generation)
}

/// Index `snippets` with `engine`; see [`QaEngine::build_index`]
pub async fn build_index(engine: &QaEngine, snippets: &[String]) -> Result<IndexedEngine, Error> {
    engine.build_index(snippets).await
}

/// Answer `question` with an indexed engine; see [`IndexedEngine::query`]
pub async fn query(engine: &IndexedEngine, question: &str) -> Result<String, Error> {
    engine.query(question).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::provider::{Provider, ProviderConfig};
    use mockito::Matcher;
    use serde_json::json;

    fn engine_at(url: &str) -> QaEngine {
        let embedding = EmbeddingConfig::new(
            ProviderConfig::new(Provider::Cohere, "co-key").with_base_url(url),
        );
        let generation =
            GenerationConfig::new(ProviderConfig::new(Provider::Ai21, "a2-key").with_base_url(url));
        create_engine(embedding, generation).unwrap()
    }

    #[test]
    fn test_ai21_cannot_embed() {
        let embedding = EmbeddingConfig::new(ProviderConfig::new(Provider::Ai21, "k"));
        let generation = GenerationConfig::new(ProviderConfig::new(Provider::Ai21, "k"));
        match create_engine(embedding, generation) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("embeddings")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let embedding = EmbeddingConfig::new(ProviderConfig::new(Provider::Cohere, "  "));
        let generation = GenerationConfig::new(ProviderConfig::new(Provider::Ai21, "k"));
        match create_engine(embedding, generation) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("COHERE_API_KEY")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_top_k_is_rejected() {
        let engine = engine_at("http://127.0.0.1:9");
        let settings = RetrievalSettings {
            top_k: 0,
            ..RetrievalSettings::default()
        };
        assert!(matches!(
            engine.with_settings(settings),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_settings() {
        let engine = engine_at("http://127.0.0.1:9");
        let before = engine.fingerprint().to_string();
        let engine = engine
            .with_settings(RetrievalSettings {
                top_k: 2,
                ..RetrievalSettings::default()
            })
            .unwrap();
        assert_ne!(before, engine.fingerprint());
    }

    #[tokio::test]
    async fn test_empty_index_answers_without_requests() {
        let mut server = mockito::Server::new_async().await;
        let any = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let engine = engine_at(&server.url());
        let indexed = build_index(&engine, &[]).await.unwrap();
        assert_eq!(indexed.chunk_count(), 0);
        assert_eq!(query(&indexed, "anything").await.unwrap(), EMPTY_RESPONSE);

        let blank = engine.build_index(&["   ".to_string()]).await.unwrap();
        assert_eq!(blank.query("anything").await.unwrap(), EMPTY_RESPONSE);

        any.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_question_is_invalid() {
        let engine = engine_at("http://127.0.0.1:9");
        let indexed = engine.build_index(&[]).await.unwrap();
        assert!(matches!(
            indexed.query("  \n").await,
            Err(Error::InvalidQuestion)
        ));
    }

    #[tokio::test]
    async fn test_query_retrieves_and_synthesizes() {
        let mut server = mockito::Server::new_async().await;
        let index_embed = server
            .mock("POST", "/v1/embed")
            .match_body(Matcher::PartialJson(json!({"texts": ["T1", "T2"]})))
            .with_status(200)
            .with_body(r#"{"embeddings":[[1.0,0.0],[0.0,1.0]]}"#)
            .create_async()
            .await;
        let question_embed = server
            .mock("POST", "/v1/embed")
            .match_body(Matcher::PartialJson(
                json!({"texts": ["What molecules are of interest?"]}),
            ))
            .with_status(200)
            .with_body(r#"{"embeddings":[[0.9,0.1]]}"#)
            .create_async()
            .await;
        let complete = server
            .mock("POST", "/studio/v1/j2-ultra/complete")
            .match_body(Matcher::Regex("T1".to_string()))
            .with_status(200)
            .with_body(r#"{"completions":[{"data":{"text":"  Retinoic acid.\n"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let engine = engine_at(&server.url());
        let indexed = engine
            .build_index(&["T1".to_string(), "T2".to_string()])
            .await
            .unwrap();
        assert_eq!(indexed.chunk_count(), 2);

        let answer = indexed
            .query(" What molecules are of interest? ")
            .await
            .unwrap();
        assert_eq!(answer, "Retinoic acid.");

        index_embed.assert_async().await;
        question_embed.assert_async().await;
        complete.assert_async().await;
    }

    #[tokio::test]
    async fn test_index_id_depends_on_snippets() {
        let engine = engine_at("http://127.0.0.1:9");
        let a = engine.build_index(&[]).await.unwrap();
        let b = engine.build_index(&[]).await.unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), index_id(engine.fingerprint(), &["x".to_string()]));
    }
}
