//! `draftwright plan`: Plan a proposal outline.

use super::{CliResult, generator, load_config, read_requirement};
use draftwright_engine::plan_outline;
use draftwright_providers::build_from_config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, requirement: &Path) -> CliResult {
    let config = load_config(config_path)?;
    let router = build_from_config(&config);
    let generator = generator(&config, &router)?;
    let requirement = read_requirement(requirement)?;

    let outline = plan_outline(&generator, &requirement, config.generation.requirement_excerpt_chars).await;
    if outline.is_default() {
        eprintln!("Backend outline unusable; printing the default outline.");
    } else if !outline.appended.is_empty() {
        eprintln!("Appended missing sections: {}", outline.appended.join(", "));
    }
    println!("{}", serde_json::to_string_pretty(&outline.to_json())?);
    Ok(())
}
