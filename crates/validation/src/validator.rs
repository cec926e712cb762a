//! Structural validator.
//!
//! Three independent rule groups over an assembled proposal:
//!
//! - **structure**: every required section identity has a numbered heading
//! - **content**: no reasoning tags, no foreign script, no empty sections,
//!   at most `max_code_fences` fence markers
//! - **numbering**: top-level headings run 1, 2, 3, … and subsection labels
//!   are hierarchical
//!
//! A document is valid when all three groups are.

use crate::grammar::{self, Heading};
use draftwright_core::SectionIdentity;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Outcome of one rule group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub valid: bool,
    pub issues: Vec<String>,
}

impl RuleResult {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub structure: RuleResult,
    pub content: RuleResult,
    pub numbering: RuleResult,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    /// All issues, prefixed with their rule group.
    pub fn issues(&self) -> impl Iterator<Item = String> + '_ {
        [
            ("structure", &self.structure),
            ("content", &self.content),
            ("numbering", &self.numbering),
        ]
        .into_iter()
        .flat_map(|(group, rule)| rule.issues.iter().map(move |i| format!("[{group}] {i}")))
    }
}

/// Tunable limits of the content rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    /// Maximum fenced-code delimiter lines
    pub max_code_fences: usize,
    /// Advisory minimum number of tables (informational only)
    pub min_tables: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_code_fences: 5,
            min_tables: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StructuralValidator {
    rules: ValidationRules,
}

impl StructuralValidator {
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn validate(&self, document: &str) -> ValidationReport {
        let headings = grammar::headings(document);
        let mut suggestions = Vec::new();

        let structure = check_structure(&headings, &mut suggestions);
        let content = self.check_content(document, &headings, &mut suggestions);
        let numbering = check_numbering(document, &headings, &mut suggestions);

        let is_valid = structure.valid && content.valid && numbering.valid;
        debug!(
            is_valid,
            structure_issues = structure.issues.len(),
            content_issues = content.issues.len(),
            numbering_issues = numbering.issues.len(),
            "Document validated"
        );

        ValidationReport {
            is_valid,
            structure,
            content,
            numbering,
            suggestions,
        }
    }

    fn check_content(
        &self,
        document: &str,
        headings: &[Heading],
        suggestions: &mut Vec<String>,
    ) -> RuleResult {
        let mut issues = Vec::new();

        if grammar::has_think_tags(document) {
            issues.push("Reasoning tags (<think>) present in the document".to_string());
            suggestions.push("Remove reasoning spans and their tags".to_string());
        }

        let foreign: Vec<char> = document.chars().filter(|c| !grammar::is_allowed_char(*c)).collect();
        if !foreign.is_empty() {
            let sample: String = foreign.iter().take(10).collect();
            issues.push(format!(
                "{} characters outside the allowed script (e.g. \"{sample}\")",
                foreign.len()
            ));
            suggestions.push("Remove text written in non-Latin scripts".to_string());
        }

        let lines: Vec<&str> = document.lines().collect();
        let mut empty = 0;
        for (i, heading) in headings.iter().enumerate() {
            let end = headings.get(i + 1).map_or(lines.len(), |next| next.line);
            let has_body = lines[heading.line + 1..end].iter().any(|l| !l.trim().is_empty());
            if !has_body {
                issues.push(format!("Section '{}. {}' has no content", heading.number, heading.title));
                empty += 1;
            }
        }
        if empty > 0 {
            suggestions.push("Write content for every section or remove the empty headings".to_string());
        }

        let fences = lines.iter().filter(|l| grammar::is_fence(l)).count();
        if fences > self.rules.max_code_fences {
            issues.push(format!(
                "{fences} fenced code block markers (maximum {})",
                self.rules.max_code_fences
            ));
            suggestions.push("Replace code blocks with prose or tables".to_string());
        }

        let table_rows = lines.iter().filter(|l| grammar::is_table_row(l)).count();
        let tables = count_tables(&lines);
        if tables < self.rules.min_tables {
            issues.push(format!("{tables} tables (minimum {})", self.rules.min_tables));
        }
        debug!(fences, tables, table_rows, "Content spans counted");

        RuleResult::from_issues(issues)
    }
}

/// Validate with the default rules.
pub fn validate(document: &str) -> ValidationReport {
    StructuralValidator::default().validate(document)
}

fn check_structure(headings: &[Heading], suggestions: &mut Vec<String>) -> RuleResult {
    let mut issues = Vec::new();
    for identity in SectionIdentity::required() {
        if !headings.iter().any(|h| identity.matches(&h.title)) {
            issues.push(format!("Missing required section: {}", identity.title()));
            suggestions.push(format!("Add a '{}' section", identity.title()));
        }
    }
    RuleResult::from_issues(issues)
}

fn check_numbering(document: &str, headings: &[Heading], suggestions: &mut Vec<String>) -> RuleResult {
    let mut issues = Vec::new();

    let mut previous: Option<u32> = None;
    for heading in headings {
        match previous {
            None if heading.number != 1 => {
                issues.push(format!("Numbering must start at 1, found {}", heading.number));
            }
            Some(prev) if prev.checked_add(1) != Some(heading.number) => {
                issues.push(format!("Non-sequential sections: {prev} -> {}", heading.number));
            }
            _ => {}
        }
        previous = Some(heading.number);
    }

    let mut chapter: Option<u32> = None;
    let mut last_label: Option<(u32, u32)> = None;
    for line in document.lines() {
        if let Some((number, _)) = grammar::parse_heading(line) {
            chapter = Some(number);
            continue;
        }
        let Some((c, s, _)) = grammar::parse_subsection(line) else {
            continue;
        };

        match last_label {
            Some((pc, ps)) if c < pc => {
                issues.push(format!("Chapter number decreases: {pc}.{ps} -> {c}.{s}"));
            }
            Some((pc, ps)) if c == pc && ps.checked_add(1) != Some(s) => {
                issues.push(format!("Non-sequential subsections: {pc}.{ps} -> {c}.{s}"));
            }
            Some((pc, ps)) if c > pc && s != 1 => {
                issues.push(format!("First subsection of chapter {c} must be {c}.1: {pc}.{ps} -> {c}.{s}"));
            }
            None if s != 1 => {
                issues.push(format!("First subsection must be {c}.1, found {c}.{s}"));
            }
            _ => {}
        }
        if let Some(enclosing) = chapter.filter(|&enclosing| enclosing != c) {
            issues.push(format!("Subsection {c}.{s} is inside section {enclosing}"));
        }
        last_label = Some((c, s));
    }

    if !issues.is_empty() {
        suggestions.push("Renumber sections sequentially starting at 1".to_string());
    }
    RuleResult::from_issues(issues)
}

/// Runs of consecutive table rows.
fn count_tables(lines: &[&str]) -> usize {
    let mut tables = 0;
    let mut in_table = false;
    for line in lines {
        let row = grammar::is_table_row(line);
        if row && !in_table {
            tables += 1;
        }
        in_table = row;
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_document() -> String {
        let titles = [
            "INTRODUCCIÓN",
            "OBJETIVOS",
            "ALCANCE",
            "METODOLOGÍA",
            "PLAN DE TRABAJO",
            "ENTREGABLES",
            "RECURSOS",
            "GESTIÓN DE RIESGOS",
            "PLAN DE CALIDAD",
            "NORMATIVAS Y ESTÁNDARES",
            "EXPERIENCIA",
        ];
        titles
            .iter()
            .enumerate()
            .map(|(i, t)| format!("## {}. {t}\n\nContenido de la sección {t}.\n", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn complete_document_is_valid() {
        let report = validate(&complete_document());
        assert!(report.is_valid, "{report:?}");
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn missing_identity_is_reported_with_suggestion() {
        let doc = complete_document().replace("GESTIÓN DE RIESGOS", "OTROS TEMAS");
        let report = validate(&doc);
        assert!(!report.structure.valid);
        assert_eq!(report.structure.issues, vec!["Missing required section: GESTIÓN DE RIESGOS"]);
        assert!(report.suggestions.contains(&"Add a 'GESTIÓN DE RIESGOS' section".to_string()));
        assert!(report.numbering.valid);
    }

    #[test]
    fn skipped_number_is_reported() {
        let doc = "## 1. INTRODUCCIÓN\na\n## 2. OBJETIVOS\nb\n## 4. ALCANCE\nc";
        let report = validate(doc);
        assert!(!report.numbering.valid);
        assert!(report.numbering.issues.iter().any(|i| i.contains("2 -> 4")));
        assert!(!report.is_valid);
    }

    #[test]
    fn subsection_hierarchy() {
        let doc = "## 1. A\nx\n### 1.1 a\n### 1.3 b\n## 2. B\ny\n### 2.2 c\n### 1.4 d";
        let issues = validate(doc).numbering.issues;
        assert!(issues.iter().any(|i| i.contains("1.1 -> 1.3")));
        assert!(issues.iter().any(|i| i.contains("1.3 -> 2.2")));
        assert!(issues.iter().any(|i| i.contains("2.2 -> 1.4")));
        assert!(issues.iter().any(|i| i.contains("Subsection 1.4 is inside section 2")));
    }

    #[test]
    fn numbers_at_u32_max_are_reported() {
        let max = u32::MAX;
        let doc = format!("## {max}. A\nx\n### {max}.{max} a\n### {max}.1 b\n## 1. B\ny");
        let issues = validate(&doc).numbering.issues;
        assert!(issues.iter().any(|i| i == &format!("Numbering must start at 1, found {max}")));
        assert!(issues.iter().any(|i| i == &format!("Non-sequential sections: {max} -> 1")));
        assert!(issues.iter().any(|i| i.contains(&format!("{max}.{max} -> {max}.1"))));
    }

    #[test]
    fn empty_sections_are_content_issues() {
        let doc = "## 1. A\n\n## 2. B\ntexto\n## 3. C\n   \n";
        let report = validate(doc);
        assert!(!report.content.valid);
        assert_eq!(report.content.issues.len(), 2);
        assert!(report.content.issues[0].contains("'1. A'"));
        assert!(report.content.issues[1].contains("'3. C'"));
    }

    #[test]
    fn forbidden_spans_and_fences() {
        let fences = "```\ncode\n```\n".repeat(3);
        let doc = format!("## 1. A\n<think>x</think> texto 漢字\n{fences}");
        let report = validate(&doc);
        assert!(!report.content.valid);
        let joined = report.content.issues.join("\n");
        assert!(joined.contains("Reasoning tags"));
        assert!(joined.contains("2 characters outside"));
        assert!(joined.contains("6 fenced code block markers"));
    }

    #[test]
    fn tables_are_informational() {
        let report = validate(&complete_document());
        assert!(report.content.valid);
        assert_eq!(count_tables(&["| a |", "| b |", "", "| c |"]), 2);
    }
}
