//! Generation backend wrapper.
//!
//! The rest of the engine sees the backend as `generate(prompt) -> text`.
//! [`Generator`] binds a [`Provider`] to a model and sampling settings and
//! bounds every call with a timeout; an elapsed timeout surfaces as
//! [`ProviderError::Timeout`] like any other backend failure.

use draftwright_config::AppConfig;
use draftwright_core::error::ProviderError;
use draftwright_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.3,
            max_tokens: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Model, sampling, and per-call timeout from config.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, config.default_model.clone())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_timeout(Duration::from_secs(config.generation.section_timeout_secs))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Generate text for a single prompt.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.call(None, prompt).await
    }

    /// Generate text with standing instructions sent as a system message.
    pub async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        self.call(Some(system), prompt).await
    }

    async fn call(&self, system: Option<&str>, prompt: &str) -> Result<String, ProviderError> {
        let mut request = ProviderRequest::prompt(&self.model, system, prompt);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let started = std::time::Instant::now();
        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!(
                    "{} did not answer within {}s",
                    self.provider.name(),
                    self.timeout.as_secs()
                ))
            })??;

        debug!(
            provider = %self.provider.name(),
            model = %response.model,
            prompt_chars = prompt.chars().count(),
            answer_chars = response.message.content.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend call complete"
        );
        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, FnProvider, SlowProvider};
    use draftwright_core::message::Role;

    #[tokio::test]
    async fn forwards_system_and_settings() {
        let provider = Arc::new(FnProvider::new(|req| {
            assert_eq!(req.model, "m");
            assert_eq!(req.max_tokens, Some(99));
            assert_eq!(req.messages[0].role, Role::System);
            Ok(format!("eco: {}", req.messages[1].content))
        }));
        let generator = Generator::new(provider, "m").with_max_tokens(99);
        let answer = generator.generate_with_system("reglas", "hola").await.unwrap();
        assert_eq!(answer, "eco: hola");
    }

    #[tokio::test]
    async fn backend_errors_pass_through() {
        let generator = Generator::new(Arc::new(FailingProvider::network()), "m");
        let err = generator.generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let generator = Generator::new(Arc::new(SlowProvider::new(Duration::from_secs(60))), "m")
            .with_timeout(Duration::from_secs(5));
        let err = generator.generate("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }
}
