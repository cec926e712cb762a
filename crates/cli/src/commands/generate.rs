//! `draftwright generate`: Synthesize a full proposal.

use super::{CliResult, embedder, generator, load_config, open_index, read_requirement};
use draftwright_engine::{GenerationState, Orchestrator, analyze_requirement, plan_outline};
use draftwright_index::SectionRetriever;
use draftwright_providers::build_from_config;
use draftwright_validation::repair_outline;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(
    config_path: Option<&Path>,
    requirement_path: &Path,
    outline_path: Option<PathBuf>,
    output: Option<PathBuf>,
    analyze: bool,
) -> CliResult {
    let config = load_config(config_path)?;
    let router = build_from_config(&config);
    let generator = generator(&config, &router)?;
    let excerpt_chars = config.generation.requirement_excerpt_chars;

    let mut requirement = read_requirement(requirement_path)?;
    if analyze {
        requirement = analyze_requirement(&generator, requirement, excerpt_chars * 8).await;
    }

    let outline = match outline_path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read outline {}: {e}", path.display()))?;
            let outline = repair_outline(&raw);
            if outline.is_default() {
                warn!(path = %path.display(), "Outline file unusable, using the default outline");
            }
            outline
        }
        None => plan_outline(&generator, &requirement, excerpt_chars).await,
    };
    info!(sections = outline.entries.len(), "Outline ready");

    let index = open_index(&config, embedder(&config, &router)?)?;
    if index.is_empty().await {
        warn!("Passage index is empty; sections are generated without precedent");
    }
    let retriever = Arc::new(SectionRetriever::from_config(index, &config.retrieval));

    let orchestrator = Orchestrator::from_config(generator, Some(retriever), &config);
    let state = orchestrator.synthesize(outline.sections(), Some(requirement)).await;

    let Some(proposal) = state.proposal() else {
        let message = state
            .status_message
            .clone()
            .unwrap_or_else(|| state.errors.join("; "));
        return Err(message.into());
    };

    let output = output.unwrap_or_else(default_output);
    std::fs::write(&output, proposal)?;
    let report_path = PathBuf::from(format!("{}.evaluation.json", output.display()));
    std::fs::write(&report_path, serde_json::to_string_pretty(&summary(&state))?)?;

    println!("Proposal written to {}", output.display());
    println!("Evaluation written to {}\n", report_path.display());
    if let Some(message) = &state.status_message {
        println!("{message}");
    }
    if !state.placeholders.is_empty() {
        println!("\n{} section(s) could not be generated:", state.placeholders.len());
        for name in &state.placeholders {
            println!("  - {name}");
        }
    }
    if !state.errors.is_empty() {
        println!("\nErrors:");
        for error in &state.errors {
            println!("  - {error}");
        }
    }
    Ok(())
}

fn default_output() -> PathBuf {
    PathBuf::from(format!(
        "propuesta_{}.md",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

fn summary(state: &GenerationState) -> serde_json::Value {
    serde_json::json!({
        "sections": state.sections().len(),
        "generated": state.generated_content.keys().collect::<Vec<_>>(),
        "placeholders": state.placeholders,
        "evaluation": state.evaluation,
        "validation": state.validation,
        "repairs_applied": state.repairs_applied,
        "errors": state.errors,
        "status_message": state.status_message,
    })
}
