//! Embedder trait: the abstraction over embedding backends.
//!
//! The passage index only ever needs `texts -> vectors`. Any [`Provider`]
//! that implements `embed` can be adapted with [`ProviderEmbedder`]; the
//! index crate ships an offline hashing embedder as well.

use crate::error::ProviderError;
use crate::provider::{EmbeddingRequest, Provider};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns text into fixed-dimension vectors.
///
/// Implementations must be deterministic per input for a fixed
/// configuration; the index relies on that to compare query and passage
/// vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name (e.g., "hashing", "ollama/nomic-embed-text").
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or(ProviderError::EmptyResponse)
    }
}

/// Adapts a [`Provider`] with embedding support into an [`Embedder`].
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    name: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let name = format!("{}/{}", provider.name(), model);
        Self {
            provider,
            model,
            name,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await?;
        if response.embeddings.len() != texts.len() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            });
        }
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};

    struct LengthEmbedder {
        drop_last: bool,
    }

    #[async_trait]
    impl Provider for LengthEmbedder {
        fn name(&self) -> &str {
            "length"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(""),
                usage: None,
                model: "length".into(),
                metadata: serde_json::Map::new(),
            })
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, ProviderError> {
            let mut embeddings: Vec<Vec<f32>> = request
                .inputs
                .iter()
                .map(|t| vec![t.len() as f32, 1.0])
                .collect();
            if self.drop_last {
                embeddings.pop();
            }
            Ok(EmbeddingResponse {
                embeddings,
                model: request.model,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn adapter_forwards_model_and_inputs() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthEmbedder { drop_last: false }), "e5");
        assert_eq!(embedder.name(), "length/e5");
        let vectors = embedder
            .embed(&["ab".to_string(), "abcd".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![2.0, 1.0], vec![4.0, 1.0]]);
    }

    #[tokio::test]
    async fn adapter_rejects_short_batches() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthEmbedder { drop_last: true }), "e5");
        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("expected 1 embeddings"));
    }

    #[tokio::test]
    async fn embed_one_returns_single_vector() {
        let embedder = ProviderEmbedder::new(Arc::new(LengthEmbedder { drop_last: false }), "e5");
        assert_eq!(embedder.embed_one("xyz").await.unwrap(), vec![3.0, 1.0]);
    }
}
