//! Provider fallback: ordered retry chain with per-provider timeouts.
//!
//! When a provider fails (timeout, rate limit, error), the next provider in
//! the configured chain is tried. The error of the last attempt is returned
//! when every provider fails, so the orchestrator still sees a single
//! recoverable backend failure.

use async_trait::async_trait;
use draftwright_core::Provider;
use draftwright_core::error::ProviderError;
use draftwright_core::provider::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// A provider that wraps an ordered list of providers and falls back on failure.
pub struct FallbackProvider {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    provider: Arc<dyn Provider>,
    timeout: Duration,
}

impl FallbackProvider {
    /// Create a new fallback provider with no entries.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a provider to the fallback chain with a custom timeout.
    pub fn add(mut self, provider: Arc<dyn Provider>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { provider, timeout });
        self
    }

    /// Add a provider with the default timeout.
    pub fn add_default(self, provider: Arc<dyn Provider>) -> Self {
        self.add(provider, DEFAULT_TIMEOUT)
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Run `call` against each provider in order until one succeeds.
    async fn first_success<T, F, Fut>(&self, operation: &str, call: F) -> Result<T, ProviderError>
    where
        F: Fn(Arc<dyn Provider>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut last_error = ProviderError::NotConfigured("No providers in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let provider_name = entry.provider.name().to_string();
            info!(
                provider = %provider_name,
                operation,
                attempt = i + 1,
                total = self.chain.len(),
                "Fallback: trying provider"
            );

            match tokio::time::timeout(entry.timeout, call(entry.provider.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => {
                    warn!(
                        provider = %provider_name,
                        operation,
                        error = %e,
                        "Fallback: provider failed, trying next"
                    );
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        provider = %provider_name,
                        operation,
                        timeout_secs = entry.timeout.as_secs_f32(),
                        "Fallback: provider timed out, trying next"
                    );
                    last_error = ProviderError::Timeout(format!(
                        "Provider '{}' timed out after {:.1}s",
                        provider_name,
                        entry.timeout.as_secs_f32()
                    ));
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.first_success("complete", |provider| {
            let request = request.clone();
            async move { provider.complete(request).await }
        })
        .await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        self.first_success("embed", |provider| {
            let request = request.clone();
            async move { provider.embed(request).await }
        })
        .await
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let mut all_models = Vec::new();
        for entry in &self.chain {
            if let Ok(models) = entry.provider.list_models().await {
                all_models.extend(models);
            }
        }
        Ok(all_models)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        for entry in &self.chain {
            if let Ok(true) = entry.provider.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftwright_core::message::Message;
    use std::sync::Mutex;

    /// Fails with a fixed error, or answers with its own name.
    struct MockProvider {
        name: String,
        error: Option<ProviderError>,
        delay: Option<Duration>,
        call_count: Mutex<usize>,
    }

    impl MockProvider {
        fn ok(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                error: None,
                delay: None,
                call_count: Mutex::new(0),
            })
        }

        fn failing(name: &str, error: ProviderError) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                error: Some(error),
                delay: None,
                call_count: Mutex::new(0),
            })
        }

        fn slow(name: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                error: None,
                delay: Some(delay),
                call_count: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        async fn answer(&self) -> Result<(), ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.answer().await?;
            Ok(ProviderResponse {
                message: Message::assistant(self.name.clone()),
                usage: None,
                model: "test-model".into(),
                metadata: serde_json::Map::new(),
            })
        }

        async fn embed(
            &self,
            request: EmbeddingRequest,
        ) -> Result<EmbeddingResponse, ProviderError> {
            self.answer().await?;
            Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|_| vec![1.0]).collect(),
                model: self.name.clone(),
                usage: None,
            })
        }
    }

    fn test_request() -> ProviderRequest {
        ProviderRequest::prompt("test", None, "hola")
    }

    #[tokio::test]
    async fn first_provider_succeeds() {
        let p1 = MockProvider::ok("primary");
        let p2 = MockProvider::ok("secondary");
        let fallback = FallbackProvider::new("test")
            .add_default(p1.clone())
            .add_default(p2.clone());

        let response = fallback.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "primary");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_on_failure() {
        let p1 = MockProvider::failing(
            "primary",
            ProviderError::ApiError {
                status_code: 500,
                message: "Internal Server Error".into(),
            },
        );
        let p2 = MockProvider::ok("secondary");
        let fallback = FallbackProvider::new("test")
            .add_default(p1.clone())
            .add_default(p2.clone());

        let response = fallback.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "secondary");
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn all_providers_fail_returns_last_error() {
        let fallback = FallbackProvider::new("test")
            .add_default(MockProvider::failing(
                "primary",
                ProviderError::Network("conn refused".into()),
            ))
            .add_default(MockProvider::failing(
                "secondary",
                ProviderError::AuthenticationFailed("bad key".into()),
            ));

        match fallback.complete(test_request()).await.unwrap_err() {
            ProviderError::AuthenticationFailed(_) => {}
            other => panic!("Expected AuthenticationFailed, got: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_triggers_fallback() {
        let p1 = MockProvider::slow("hanging", Duration::from_secs(3600));
        let p2 = MockProvider::ok("secondary");
        let fallback = FallbackProvider::new("test")
            .add(p1, Duration::from_millis(50))
            .add_default(p2.clone());

        let response = fallback.complete(test_request()).await.unwrap();
        assert_eq!(response.message.content, "secondary");
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lone_timeout_reports_timeout() {
        let fallback = FallbackProvider::new("test")
            .add(MockProvider::slow("hanging", Duration::from_secs(10)), Duration::from_secs(1));
        let err = fallback.complete(test_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn embed_falls_back_too() {
        let fallback = FallbackProvider::new("test")
            .add_default(MockProvider::failing(
                "no-embed",
                ProviderError::NotConfigured("no embeddings".into()),
            ))
            .add_default(MockProvider::ok("embedder"));

        let response = fallback
            .embed(EmbeddingRequest {
                model: "e".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(response.model, "embedder");
        assert_eq!(response.embeddings.len(), 2);
    }

    #[tokio::test]
    async fn empty_chain_returns_not_configured() {
        let fallback = FallbackProvider::new("empty");
        assert!(fallback.is_empty());
        match fallback.complete(test_request()).await.unwrap_err() {
            ProviderError::NotConfigured(_) => {}
            other => panic!("Expected NotConfigured, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn health_check_any_healthy() {
        let fallback = FallbackProvider::new("test")
            .add_default(MockProvider::failing("bad", ProviderError::Network("down".into())))
            .add_default(MockProvider::ok("good"));
        assert_eq!(fallback.len(), 2);
        assert!(fallback.health_check().await.unwrap());
    }
}
