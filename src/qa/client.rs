//! HTTP clients for the embedding and completion endpoints of each provider.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::Error;
use crate::qa::provider::{Provider, ProviderConfig};
use crate::utils::HttpClient;

/// Texts sent per embedding request (Cohere's per-call limit)
const EMBED_BATCH_SIZE: usize = 96;

/// Longest slice of an error body quoted in error messages
const MAX_ERROR_BODY: usize = 200;

/// Sampling settings for a completion
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenerationParams {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Talks to one provider for one role (embedding or generation)
#[derive(Debug)]
pub(crate) struct ProviderClient {
    config: ProviderConfig,
    model: String,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct CohereEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct CohereGenerateResponse {
    generations: Vec<CohereGeneration>,
}

#[derive(Debug, Deserialize)]
struct CohereGeneration {
    text: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ai21CompleteResponse {
    completions: Vec<Ai21Completion>,
}

#[derive(Debug, Deserialize)]
struct Ai21Completion {
    data: Ai21CompletionData,
}

#[derive(Debug, Deserialize)]
struct Ai21CompletionData {
    text: String,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig, model: String, http: HttpClient) -> Self {
        Self {
            config,
            model,
            http,
        }
    }

    pub fn provider(&self) -> Provider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn fingerprint(&self) -> String {
        self.config.fingerprint(&self.model)
    }

    fn transient(&self, message: impl Into<String>) -> Error {
        Error::TransientProvider {
            provider: self.config.provider.name().to_string(),
            message: message.into(),
        }
    }

    /// POST a JSON body with bearer auth and decode the JSON reply
    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, Error> {
        let url = format!("{}{}", self.config.base_url(), path);
        tracing::debug!("{} request: {}", self.config.provider, url);

        let response = self
            .http
            .client()
            .post(&url)
            .bearer_auth(self.config.api_key())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transient(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transient(format!("failed to read response: {}", e)))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Configuration(format!(
                "{} rejected the API key (status {})",
                self.config.provider, status
            )));
        }
        if !status.is_success() {
            return Err(self.transient(format!(
                "status {}: {}",
                status,
                error_message(&text)
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| self.transient(format!("unexpected response body: {}", e)))
    }

    /// Embed texts, returning one vector per input in input order
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let embedded = match self.config.provider {
                Provider::Cohere => {
                    let body = json!({
                        "texts": batch,
                        "model": self.model,
                        "truncate": "END",
                    });
                    let response: CohereEmbedResponse = self.post_json("/v1/embed", body).await?;
                    response.embeddings
                }
                Provider::OpenAi => {
                    let body = json!({
                        "model": self.model,
                        "input": batch,
                    });
                    let mut response: OpenAiEmbeddingResponse =
                        self.post_json("/v1/embeddings", body).await?;
                    response.data.sort_by_key(|item| item.index);
                    response.data.into_iter().map(|item| item.embedding).collect()
                }
                Provider::Ai21 => {
                    return Err(Error::Configuration(
                        "AI21 does not provide embeddings".to_string(),
                    ))
                }
            };

            if embedded.len() != batch.len() {
                return Err(self.transient(format!(
                    "expected {} embeddings, received {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            vectors.extend(embedded);
        }

        Ok(vectors)
    }

    /// Generate a completion for a single prompt
    pub async fn complete(&self, prompt: &str, params: GenerationParams) -> Result<String, Error> {
        match self.config.provider {
            Provider::Cohere => {
                let body = json!({
                    "model": self.model,
                    "prompt": prompt,
                    "max_tokens": params.max_output_tokens,
                    "temperature": params.temperature,
                });
                let response: CohereGenerateResponse =
                    self.post_json("/v1/generate", body).await?;
                response
                    .generations
                    .into_iter()
                    .next()
                    .map(|g| g.text)
                    .ok_or_else(|| self.transient("response contained no generations"))
            }
            Provider::OpenAi => {
                let body = json!({
                    "model": self.model,
                    "messages": [{"role": "user", "content": prompt}],
                    "max_tokens": params.max_output_tokens,
                    "temperature": params.temperature,
                });
                let response: OpenAiChatResponse =
                    self.post_json("/v1/chat/completions", body).await?;
                response
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| self.transient("response contained no choices"))?
                    .message
                    .content
                    .ok_or_else(|| self.transient("response choice has no content"))
            }
            Provider::Ai21 => {
                let body = json!({
                    "prompt": prompt,
                    "maxTokens": params.max_output_tokens,
                    "temperature": params.temperature,
                });
                let path = format!("/studio/v1/{}/complete", self.model);
                let response: Ai21CompleteResponse = self.post_json(&path, body).await?;
                response
                    .completions
                    .into_iter()
                    .next()
                    .map(|c| c.data.text)
                    .ok_or_else(|| self.transient("response contained no completions"))
            }
        }
    }
}

/// Best-effort extraction of a provider's error message
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value["error"]["message"]
            .as_str()
            .or_else(|| value["error"].as_str())
            .or_else(|| value["message"].as_str())
            .or_else(|| value["detail"].as_str());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    body.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(provider: Provider, model: &str, base_url: &str) -> ProviderClient {
        ProviderClient::new(
            ProviderConfig::new(provider, "test-key").with_base_url(base_url),
            model.to_string(),
            HttpClient::new().unwrap(),
        )
    }

    const PARAMS: GenerationParams = GenerationParams {
        max_output_tokens: 64,
        temperature: 0.0,
    };

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"quota exceeded"}}"#),
            "quota exceeded"
        );
        assert_eq!(error_message(r#"{"message":"invalid model"}"#), "invalid model");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_cohere_embed_and_generate() {
        let mut server = mockito::Server::new_async().await;
        let embed = server
            .mock("POST", "/v1/embed")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({"model": "embed-multilingual-v2.0"})))
            .with_status(200)
            .with_body(r#"{"embeddings":[[1.0,0.0],[0.0,1.0]]}"#)
            .create_async()
            .await;
        let generate = server
            .mock("POST", "/v1/generate")
            .with_status(200)
            .with_body(r#"{"generations":[{"text":" Retinoic acid."}]}"#)
            .create_async()
            .await;

        let embedder = client(Provider::Cohere, "embed-multilingual-v2.0", &server.url());
        let vectors = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

        let generator = client(Provider::Cohere, "command", &server.url());
        let text = generator.complete("prompt", PARAMS).await.unwrap();
        assert_eq!(text, " Retinoic acid.");

        embed.assert_async().await;
        generate.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_embeddings_are_reordered_by_index() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(
                r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            )
            .create_async()
            .await;

        let embedder = client(Provider::OpenAi, "text-embedding-ada-002", &server.url());
        let vectors = embedder
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_ai21_complete_uses_model_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/studio/v1/j2-ultra/complete")
            .match_body(Matcher::PartialJson(json!({"maxTokens": 64})))
            .with_status(200)
            .with_body(r#"{"completions":[{"data":{"text":"CRABP II"}}]}"#)
            .create_async()
            .await;

        let generator = client(Provider::Ai21, "j2-ultra", &server.url());
        assert_eq!(generator.complete("q", PARAMS).await.unwrap(), "CRABP II");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_null_chat_content_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
            .create_async()
            .await;

        let generator = client(Provider::OpenAi, "gpt-3.5-turbo", &server.url());
        let err = generator.complete("q", PARAMS).await.unwrap_err();
        match err {
            Error::TransientProvider { message, .. } => assert!(message.contains("no content")),
            other => panic!("expected transient error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body(r#"{"error":{"message":"overloaded"}}"#)
            .create_async()
            .await;

        let generator = client(Provider::OpenAi, "gpt-3.5-turbo", &server.url());
        let err = generator.complete("q", PARAMS).await.unwrap_err();
        match &err {
            Error::TransientProvider { provider, message } => {
                assert_eq!(provider, "OpenAI");
                assert!(message.contains("overloaded"));
            }
            other => panic!("expected transient error, got {:?}", other),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejected_key_is_configuration_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embed")
            .with_status(401)
            .with_body(r#"{"message":"invalid api token"}"#)
            .create_async()
            .await;

        let embedder = client(Provider::Cohere, "embed-multilingual-v2.0", &server.url());
        let err = embedder.embed(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embed")
            .with_status(200)
            .with_body(r#"{"embeddings":[[1.0]]}"#)
            .create_async()
            .await;

        let embedder = client(Provider::Cohere, "embed-multilingual-v2.0", &server.url());
        let err = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransientProvider { .. }));
    }
}
