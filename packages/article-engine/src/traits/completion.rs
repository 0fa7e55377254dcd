//! Text completion trait for LLM operations.
//!
//! The trait abstracts the four model capabilities the pipeline needs:
//! plain completions, JSON-structured completions, embeddings, and
//! generated images. Implementations wrap a specific provider and own the
//! retry policy for transient failures.

use async_trait::async_trait;

use crate::error::Result;

/// LLM operations used by the pipeline.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Plain-text completion.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// JSON-structured completion with best-effort parsing.
    ///
    /// A response that is still malformed after the implementation's
    /// retries surfaces as an error here; it never panics and never
    /// returns partially-parsed data.
    async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value>;

    /// Generate an embedding for text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate an image from a prompt; returns the hosted image URL.
    async fn generate_image(&self, prompt: &str, size: &str) -> Result<String>;
}

#[cfg(feature = "openai")]
mod openai_impl {
    use super::*;
    use crate::error::EngineError;
    use completion_client::CompletionClient;

    #[async_trait]
    impl TextCompletion for CompletionClient {
        async fn complete(&self, system: &str, user: &str) -> Result<String> {
            self.chat(system, user).await.map_err(EngineError::completion)
        }

        async fn complete_json(&self, system: &str, user: &str) -> Result<serde_json::Value> {
            self.chat_json(system, user)
                .await
                .map_err(EngineError::completion)
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.create_embedding(text)
                .await
                .map_err(EngineError::completion)
        }

        async fn generate_image(&self, prompt: &str, size: &str) -> Result<String> {
            CompletionClient::generate_image(self, prompt, size)
                .await
                .map_err(EngineError::completion)
        }
    }
}
