//! `draftwright search`: Show what retrieval returns for a section.

use super::{CliResult, embedder, load_config, open_index};
use draftwright_core::requirement::truncate_chars;
use draftwright_index::{RetrievalStatus, SectionRetriever};
use draftwright_providers::build_from_config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, section: &str, query: Option<String>, k: usize) -> CliResult {
    let config = load_config(config_path)?;
    let router = build_from_config(&config);
    let index = open_index(&config, embedder(&config, &router)?)?;
    let retriever = SectionRetriever::from_config(index, &config.retrieval);

    let context = query.unwrap_or_default();
    println!("Query: {}\n", retriever.build_query(section, &context));

    let retrieval = retriever.retrieve(section, &context, k).await;
    match retrieval.status {
        RetrievalStatus::NotReady => {
            println!("Index is empty. Run `draftwright index` first.");
            return Ok(());
        }
        RetrievalStatus::Failed => {
            println!("Retrieval failed; see the log for details.");
            return Ok(());
        }
        RetrievalStatus::Ready => {}
    }

    if retrieval.results.is_empty() {
        println!("No passages found.");
    }
    for (i, result) in retrieval.results.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            result.score,
            result.project_name,
            result.project_code
        );
        println!("   {}", result.source);
        println!("   {}\n", truncate_chars(result.passage_text.trim(), 300).replace('\n', " "));
    }
    if !retrieval.filtered && !retrieval.results.is_empty() {
        println!("(no passage mentioned the section; showing nearest passages)");
    }
    Ok(())
}
