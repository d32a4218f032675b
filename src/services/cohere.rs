use moka::future::Cache;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::CohereSettings;

/// Errors that can occur when calling the Cohere API
#[derive(Debug, Error)]
pub enum CohereError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Cohere API returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("No response generated from Cohere")]
    EmptyResponse,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Parameters for the `/v1/generate` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct GenerateParams {
    pub max_tokens: u32,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_likelihoods: Option<String>,
}

impl GenerateParams {
    pub fn new(max_tokens: u32, temperature: f64) -> Self {
        Self {
            max_tokens,
            temperature,
            k: None,
            stop_sequences: Vec::new(),
            return_likelihoods: None,
        }
    }

    /// Low-temperature, greedy settings used for grading
    pub fn grading(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: 0.3,
            k: Some(0),
            stop_sequences: Vec::new(),
            return_likelihoods: Some("NONE".to_string()),
        }
    }
}

/// What an embedding is used for; Cohere embeds documents and queries differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    Document,
    Query,
}

impl EmbeddingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingKind::Document => "search_document",
            EmbeddingKind::Query => "search_query",
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(flatten)]
    params: &'a GenerateParams,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Deserialize)]
struct Generation {
    text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
    json_schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Cohere client covering generate, chat (JSON mode) and embed
///
/// Single-text embeddings are memoised in an in-process cache since the same
/// question text is embedded repeatedly while grading.
pub struct CohereClient {
    base_url: String,
    api_key: String,
    generate_model: String,
    chat_model: String,
    embedding_model: String,
    client: Client,
    embeddings: Cache<String, Vec<f32>>,
}

impl CohereClient {
    pub fn from_settings(settings: &CohereSettings) -> Result<Self, CohereError> {
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            generate_model: settings.generate_model.clone(),
            chat_model: settings.chat_model.clone(),
            embedding_model: settings.embedding_model.clone(),
            client: super::build_http_client(settings.timeout_secs)?,
            embeddings: Cache::new(settings.embedding_cache_size),
        })
    }

    pub fn generate_model(&self) -> &str {
        &self.generate_model
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    async fn post<T, R>(&self, path: &str, payload: &T) -> Result<R, CohereError>
    where
        T: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Cohere API error on {}: status={}, body={}", path, status, super::truncate(&body, 500));
            return Err(CohereError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CohereError::InvalidResponse(e.to_string()))
    }

    /// Single-prompt completion; returns the first generation's text
    pub async fn generate(&self, prompt: &str, params: &GenerateParams) -> Result<String, CohereError> {
        let request = GenerateRequest {
            model: &self.generate_model,
            prompt,
            params,
        };

        tracing::debug!("Cohere generate: model={}, max_tokens={}", self.generate_model, params.max_tokens);

        let response: GenerateResponse = self.post("/v1/generate", &request).await?;

        response
            .generations
            .into_iter()
            .next()
            .map(|g| g.text)
            .ok_or(CohereError::EmptyResponse)
    }

    /// Chat completion constrained to a JSON object matching `schema`
    ///
    /// Returns the first non-empty text block of the reply.
    pub async fn chat_json(&self, prompt: &str, schema: &Value) -> Result<String, CohereError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            response_format: Some(ResponseFormat {
                format_type: "json_object",
                json_schema: schema,
            }),
        };

        tracing::debug!("Cohere chat: model={}", self.chat_model);

        let response: ChatResponse = self.post("/v2/chat", &request).await?;

        let message = response.message.ok_or(CohereError::EmptyResponse)?;
        message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .find(|text| !text.is_empty())
            .ok_or_else(|| CohereError::InvalidResponse("No text content found in Cohere response".to_string()))
    }

    /// Embed a batch of texts
    pub async fn embed(&self, texts: &[String], kind: EmbeddingKind) -> Result<Vec<Vec<f32>>, CohereError> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            texts,
            input_type: kind.as_str(),
        };

        let response: EmbedResponse = self.post("/v1/embed", &request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(CohereError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings)
    }

    /// Embed one text, served from cache when seen before
    pub async fn embed_one(&self, text: &str, kind: EmbeddingKind) -> Result<Vec<f32>, CohereError> {
        let key = format!("{}|{}|{}", self.embedding_model, kind.as_str(), text);

        if let Some(hit) = self.embeddings.get(&key).await {
            tracing::trace!("Embedding cache hit ({} chars)", text.len());
            return Ok(hit);
        }

        let embedding = self
            .embed(&[text.to_string()], kind)
            .await?
            .into_iter()
            .next()
            .ok_or(CohereError::EmptyResponse)?;

        self.embeddings.insert(key, embedding.clone()).await;
        Ok(embedding)
    }
}
