//! `draftwright doctor`: Diagnose config, corpus, index, and backend.

use super::{CliResult, config_file, embedder, load_config, open_index};
use draftwright_core::Provider;
use draftwright_index::load_corpus;
use draftwright_providers::build_from_config;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> CliResult {
    println!("draftwright doctor: System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    let path = config_file(config_path);
    if !path.exists() {
        println!("  [warn] No config file at {}, using defaults (run `draftwright init`)", path.display());
        issues += 1;
    }
    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  [ok]   Config valid");
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 blocking issue found.");
            return Ok(());
        }
    };

    match load_corpus(&config.corpus.dir, &config.corpus.extensions) {
        Ok(docs) if docs.is_empty() => {
            println!("  [warn] Corpus directory {} holds no documents", config.corpus.dir.display());
            issues += 1;
        }
        Ok(docs) => println!("  [ok]   Corpus: {} documents in {}", docs.len(), config.corpus.dir.display()),
        Err(e) => {
            println!("  [warn] Corpus unavailable: {e}");
            issues += 1;
        }
    }

    let router = build_from_config(&config);
    match embedder(&config, &router).and_then(|e| open_index(&config, e)) {
        Ok(index) => match index.len().await {
            0 => {
                println!("  [warn] Passage index is empty (run `draftwright index`)");
                issues += 1;
            }
            passages => println!("  [ok]   Index: {passages} passages ({})", index.embedder_name()),
        },
        Err(e) => {
            println!("  [fail] Index unreadable: {e}");
            issues += 1;
        }
    }

    match router.generation_provider() {
        Some(provider) => match provider.health_check().await {
            Ok(true) => println!("  [ok]   Backend '{}' reachable", provider.name()),
            Ok(false) => {
                println!("  [warn] Backend '{}' did not pass its health check", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  [fail] Backend '{}': {e}", provider.name());
                issues += 1;
            }
        },
        None => {
            println!("  [fail] No generation provider configured");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }
    Ok(())
}
