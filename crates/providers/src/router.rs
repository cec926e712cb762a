//! Provider router: builds backends from configuration and hands out the
//! generation provider (optionally wrapped in a fallback chain).

use crate::fallback::FallbackProvider;
use crate::openai_compat::OpenAiCompatProvider;
use draftwright_config::AppConfig;
use draftwright_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Named providers plus the default selection.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    timeouts: HashMap<String, Duration>,
    default_provider: String,
    fallback: Vec<String>,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            timeouts: HashMap::new(),
            default_provider: default_provider.into(),
            fallback: Vec::new(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Providers to try, in order, after the default one.
    pub fn with_fallback(mut self, names: Vec<String>) -> Self {
        self.fallback = names;
        self
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// The provider used for section generation: the default one alone, or
    /// a [`FallbackProvider`] over the default followed by the configured
    /// fallbacks. Unknown fallback names are skipped with a warning.
    pub fn generation_provider(&self) -> Option<Arc<dyn Provider>> {
        let primary = self.default()?;
        if self.fallback.is_empty() {
            return Some(primary);
        }

        let timeout_for = |name: &str| self.timeouts.get(name).copied();
        let mut chain = FallbackProvider::new("fallback");
        chain = match timeout_for(&self.default_provider) {
            Some(t) => chain.add(primary, t),
            None => chain.add_default(primary),
        };
        for name in &self.fallback {
            let Some(provider) = self.get(name) else {
                warn!(provider = %name, "Fallback provider is not configured, skipping");
                continue;
            };
            chain = match timeout_for(name) {
                Some(t) => chain.add(provider, t),
                None => chain.add_default(provider),
            };
        }
        Some(Arc::new(chain))
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router =
        ProviderRouter::new(&config.default_provider).with_fallback(config.fallback_providers.clone());

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        let provider = match provider_config.timeout_secs {
            Some(secs) => {
                let timeout = Duration::from_secs(secs);
                router.timeouts.insert(name.clone(), timeout);
                OpenAiCompatProvider::with_timeout(name, &base_url, &api_key, timeout)
            }
            None => OpenAiCompatProvider::new(name, &base_url, &api_key),
        };
        router.register(name.clone(), Arc::new(provider));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                &base_url,
                &api_key,
            )),
        );
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "lmstudio" => "http://localhost:1234/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftwright_config::ProviderConfig;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("ollama");
        router.register("ollama", Arc::new(OpenAiCompatProvider::ollama(None)));

        assert!(router.get("ollama").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
        assert_eq!(router.list(), vec!["ollama"]);
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn build_from_default_config() {
        let router = build_from_config(&AppConfig::default());
        let provider = router.generation_provider().unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn fallback_chain_wraps_default() {
        let mut config = AppConfig {
            fallback_providers: vec!["openai".into(), "missing".into()],
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-test".into()),
                timeout_secs: Some(30),
                ..ProviderConfig::default()
            },
        );
        let router = build_from_config(&config);
        let provider = router.generation_provider().unwrap();
        assert_eq!(provider.name(), "fallback");
        assert_eq!(router.list(), vec!["ollama", "openai"]);
    }
}
