//! OpenAI-compatible REST client for the article pipeline.
//!
//! A clean, minimal client with no domain-specific logic. Supports chat
//! completions in plain-text and JSON modes, embeddings, and image
//! generation, with bounded fixed-delay retry on transient failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use completion_client::{CompletionClient, Message};
//!
//! let client = CompletionClient::from_env()?
//!     .with_model("gpt-4o")
//!     .with_retry(3, std::time::Duration::from_secs(2));
//!
//! // Plain text completion
//! let text = client.chat("You are a writer.", "Write a haiku.").await?;
//!
//! // JSON-structured completion (best-effort parsed)
//! let value = client.chat_json("Answer in JSON.", "Is water wet?").await?;
//!
//! // Embeddings
//! let embedding = client.create_embedding("text to embed").await?;
//! ```
//!
//! # Retry contract
//!
//! Network errors, 5xx statuses, 429 rate limits, and malformed JSON
//! responses are retried up to the configured attempt count with a fixed
//! delay between attempts. Validation errors (other 4xx) are returned
//! immediately.

pub mod error;
pub mod types;

pub use error::{CompletionError, Result};
pub use types::*;

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// OpenAI-compatible API client.
#[derive(Clone)]
pub struct CompletionClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
    image_model: String,
    max_attempts: usize,
    retry_delay: Duration,
}

impl CompletionClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            image_model: "dall-e-3".to_string(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CompletionError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model (default: text-embedding-3-small).
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Set the image generation model (default: dall-e-3).
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Set the retry policy: maximum attempts and fixed delay between them.
    pub fn with_retry(mut self, max_attempts: usize, delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Get the current chat model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Plain-text chat completion.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system))
            .message(Message::user(user));
        let request = &request;

        self.retry("chat completion", move || self.send_chat(request))
            .await
    }

    /// JSON-mode chat completion with best-effort parsing.
    ///
    /// The response is fence-stripped and parsed; a malformed response
    /// counts as transient and is retried before surfacing as
    /// [`CompletionError::Parse`].
    pub async fn chat_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system))
            .message(Message::user(user))
            .temperature(0.0)
            .json_mode();
        let request = &request;

        self.retry("JSON completion", move || async move {
            let content = self.send_chat(request).await?;
            serde_json::from_str(strip_code_blocks(&content))
                .map_err(|e| CompletionError::Parse(format!("invalid JSON response: {}", e)))
        })
        .await
    }

    /// Create an embedding for text.
    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };
        let request = &request;

        self.retry("embedding", move || async move {
            let response: EmbeddingResponse = self
                .post_json("embeddings", request)
                .await?
                .json()
                .await
                .map_err(|e| CompletionError::Parse(e.to_string()))?;

            response
                .data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .ok_or_else(|| CompletionError::Parse("no embedding in response".into()))
        })
        .await
    }

    /// Generate an image and return its hosted URL.
    pub async fn generate_image(&self, prompt: &str, size: &str) -> Result<String> {
        let request = ImageRequest {
            model: self.image_model.clone(),
            prompt: prompt.to_string(),
            size: size.to_string(),
            n: 1,
        };
        let request = &request;

        self.retry("image generation", move || async move {
            let response: ImageResponse = self
                .post_json("images/generations", request)
                .await?
                .json()
                .await
                .map_err(|e| CompletionError::Parse(e.to_string()))?;

            response
                .data
                .into_iter()
                .next()
                .map(|d| d.url)
                .ok_or_else(|| CompletionError::Parse("no image in response".into()))
        })
        .await
    }

    /// Single chat completion round trip.
    async fn send_chat(&self, request: &ChatRequest) -> Result<String> {
        let start = std::time::Instant::now();

        let response: ChatResponseRaw = self
            .post_json("chat/completions", request)
            .await?
            .json()
            .await
            .map_err(|e| CompletionError::Parse(e.to_string()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CompletionError::Parse("no choices in response".into()))
    }

    /// POST a JSON body and map the status line into the error taxonomy.
    async fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, path, "request failed");
                CompletionError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, %message, path, "API error");
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Run an operation with the configured retry policy.
    async fn retry<T, F, Fut>(&self, what: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "{} failed, retrying", what);
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
