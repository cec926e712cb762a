//! Upstream planning: requirement analysis and outline planning.
//!
//! Both steps ask the backend for JSON and never fail the caller. An
//! unusable answer keeps the free-text requirement, or falls back to the
//! default outline.

use crate::backend::Generator;
use crate::prompt;
use draftwright_core::RequirementInfo;
use draftwright_validation::{OutlineRepair, extract_json_object, repair_outline};
use serde_json::Value;
use tracing::{info, warn};

/// Turn a requirement into a structured record when possible.
///
/// Structured input is returned as-is. Free text is sent to the backend;
/// a JSON object answer becomes the `Structured` variant, anything else
/// keeps the original text.
pub async fn analyze_requirement(
    generator: &Generator,
    requirement: RequirementInfo,
    max_chars: usize,
) -> RequirementInfo {
    let text = match &requirement {
        RequirementInfo::Structured(_) => return requirement,
        RequirementInfo::FreeText(text) if text.trim().is_empty() => return requirement,
        RequirementInfo::FreeText(text) => text,
    };

    let answer = match generator.generate(&prompt::analysis_prompt(text, max_chars)).await {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, "Requirement analysis failed, keeping free text");
            return requirement;
        }
    };

    let parsed = extract_json_object(&answer).and_then(|json| serde_json::from_str::<Value>(json).ok());
    match parsed {
        Some(Value::Object(map)) if !map.is_empty() => {
            info!(fields = map.len(), "Requirement analyzed");
            RequirementInfo::Structured(map)
        }
        _ => {
            warn!("Requirement analysis answer was not a JSON object, keeping free text");
            requirement
        }
    }
}

/// Ask the backend for an outline and repair whatever comes back.
pub async fn plan_outline(
    generator: &Generator,
    requirement: &RequirementInfo,
    max_chars: usize,
) -> OutlineRepair {
    let raw = match generator.generate(&prompt::outline_prompt(requirement, max_chars)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Outline planning failed, using default outline");
            String::new()
        }
    };
    let outline = repair_outline(&raw);
    info!(
        sections = outline.entries.len(),
        default = outline.is_default(),
        appended = outline.appended.len(),
        "Outline planned"
    );
    outline
}
