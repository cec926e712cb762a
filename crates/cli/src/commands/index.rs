//! `draftwright index`: Build the passage index snapshot.

use super::{CliResult, embedder, load_config, open_index};
use draftwright_index::{Chunker, IndexOutcome, index_corpus, load_corpus};
use draftwright_providers::build_from_config;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(config_path: Option<&Path>, force: bool, directory: Option<PathBuf>) -> CliResult {
    let config = load_config(config_path)?;
    let router = build_from_config(&config);
    let embedder = embedder(&config, &router)?;
    let index = open_index(&config, embedder)?;

    let dir = directory.unwrap_or_else(|| config.corpus.dir.clone());
    let documents = load_corpus(&dir, &config.corpus.extensions)?;
    info!(dir = %dir.display(), documents = documents.len(), "Corpus loaded");

    let chunker = Chunker::from_config(&config.chunking)?;
    match index_corpus(&index, &documents, &chunker, force).await? {
        IndexOutcome::Skipped { passages } => {
            println!("Index already holds {passages} passages. Use --force to rebuild.");
        }
        IndexOutcome::Built(stats) => {
            if let Some(parent) = config.corpus.index_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            index.save(&config.corpus.index_path).await?;
            println!(
                "Indexed {} passages from {} documents into {}",
                stats.passages,
                stats.documents,
                config.corpus.index_path.display()
            );
        }
    }
    Ok(())
}
