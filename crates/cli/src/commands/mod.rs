//! Subcommand implementations and the wiring they share.

pub mod doctor;
pub mod generate;
pub mod index;
pub mod init;
pub mod plan;
pub mod search;
pub mod validate;

use draftwright_config::AppConfig;
use draftwright_core::{Embedder, ProviderEmbedder, RequirementInfo};
use draftwright_engine::Generator;
use draftwright_index::{HashingEmbedder, PassageIndex};
use draftwright_providers::ProviderRouter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Config file location: the explicit path, or the default one.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load config from `path` (or the default location) with env overrides.
pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// The generation backend: default provider plus configured fallbacks.
pub fn generator(config: &AppConfig, router: &ProviderRouter) -> CliResult<Generator> {
    let provider = router
        .generation_provider()
        .ok_or("No default provider configured")?;
    Ok(Generator::from_config(provider, config))
}

/// `embedding.provider = "hashing"` selects the offline embedder; any other
/// value names a configured provider.
pub fn embedder(config: &AppConfig, router: &ProviderRouter) -> CliResult<Arc<dyn Embedder>> {
    if config.embedding.provider == "hashing" {
        return Ok(Arc::new(HashingEmbedder::new(config.embedding.dimensions)));
    }
    let provider = router.get(&config.embedding.provider).ok_or_else(|| {
        format!(
            "Embedding provider '{}' is not configured",
            config.embedding.provider
        )
    })?;
    Ok(Arc::new(ProviderEmbedder::new(provider, config.embedding.model.clone())))
}

/// The index snapshot from `corpus.index_path`; empty when none exists.
pub fn open_index(config: &AppConfig, embedder: Arc<dyn Embedder>) -> CliResult<Arc<PassageIndex>> {
    let index = PassageIndex::load(&config.corpus.index_path, embedder, config.embedding.batch_size)?;
    Ok(Arc::new(index))
}

/// Read a requirement file: a JSON object becomes a structured record,
/// anything else free text.
pub fn read_requirement(path: &Path) -> CliResult<RequirementInfo> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read requirement {}: {e}", path.display()))?;
    let requirement = RequirementInfo::parse(&raw);
    if requirement.is_empty() {
        return Err(format!("Requirement file {} is empty", path.display()).into());
    }
    Ok(requirement)
}
