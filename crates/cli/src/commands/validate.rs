//! `draftwright validate`: Validate and optionally repair a proposal.

use super::CliResult;
use draftwright_core::Error;
use draftwright_validation::{repair, validate};
use std::path::{Path, PathBuf};

pub async fn run(file: &Path, apply_repair: bool, output: Option<PathBuf>) -> CliResult {
    let document = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let mut report = validate(&document);
    if apply_repair && !report.is_valid {
        let repaired = repair(&document, &report);
        report = validate(&repaired);
        let target = output.unwrap_or_else(|| repaired_path(file));
        std::fs::write(&target, &repaired)?;
        eprintln!("Repaired document written to {}", target.display());
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_valid {
        Ok(())
    } else {
        let issues = report.issues().count();
        Err(Box::new(Error::Validation(format!("{issues} issue(s) found"))))
    }
}

/// `propuesta.md` → `propuesta.repaired.md`
fn repaired_path(file: &Path) -> PathBuf {
    let stem = file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match file.extension() {
        Some(ext) => format!("{stem}.repaired.{}", ext.to_string_lossy()),
        None => format!("{stem}.repaired"),
    };
    file.with_file_name(name)
}
