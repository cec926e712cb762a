//! `draftwright init`: Write a default config file.

use super::{CliResult, config_file};
use draftwright_config::AppConfig;
use std::path::Path;

pub async fn run(config_path: Option<&Path>, force: bool) -> CliResult {
    let path = config_file(config_path);

    println!("draftwright: Setup");
    println!("===================\n");

    if path.exists() && !force {
        println!("Config already exists at: {}", path.display());
        println!("  Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Created config at: {}", path.display());

    let config = AppConfig::load_from(&path)?;
    if !config.corpus.dir.exists() {
        std::fs::create_dir_all(&config.corpus.dir)?;
        println!("Created corpus directory: {}", config.corpus.dir.display());
    }

    println!("\nNext steps:");
    println!("  1. Put prior proposals (.txt / .md) in {}", config.corpus.dir.display());
    println!("  2. Run `draftwright index`");
    println!("  3. Run `draftwright generate --requirement <file>`");
    Ok(())
}
