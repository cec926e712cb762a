//! Deterministic document repair.
//!
//! Best effort only: the caller re-validates afterwards. Repair never adds
//! or reorders content; a missing required section stays missing.

use crate::grammar::{
    TOC_HEADING, format_heading, format_subsection, headings, parse_heading, parse_subsection,
};
use crate::normalizer::normalize;
use crate::validator::ValidationReport;
use tracing::debug;

/// Strip reasoning spans and foreign script, and when `report` flags the
/// numbering, renumber headings and subsections in document order.
pub fn repair(document: &str, report: &ValidationReport) -> String {
    let cleaned = normalize(document);
    if report.numbering.valid {
        return cleaned;
    }
    renumber(&cleaned)
}

/// Rewrite top-level headings as `1, 2, 3, …` in order of appearance, and
/// re-key every subsection to its enclosing chapter (`C.1, C.2, …`).
/// Subsections before the first heading are left alone. A table of contents
/// is rebuilt from the renumbered headings.
pub fn renumber(document: &str) -> String {
    rebuild_toc(&renumber_headings(document))
}

fn renumber_headings(document: &str) -> String {
    let mut chapter = 0u32;
    let mut sub = 0u32;
    let mut rewritten = 0usize;

    let lines: Vec<String> = document
        .lines()
        .map(|line| {
            if let Some((number, title)) = parse_heading(line) {
                chapter = chapter.saturating_add(1);
                sub = 0;
                if number != chapter {
                    rewritten += 1;
                }
                return format_heading(chapter, title);
            }
            match parse_subsection(line) {
                Some((c, s, title)) if chapter > 0 => {
                    sub = sub.saturating_add(1);
                    if (c, s) != (chapter, sub) {
                        rewritten += 1;
                    }
                    format_subsection(chapter, sub, title)
                }
                _ => line.to_string(),
            }
        })
        .collect();

    debug!(rewritten, "Headings renumbered");
    lines.join("\n")
}

/// Replace the entries under [`TOC_HEADING`] with one `N. TITLE` line per
/// top-level heading. The entries run until the next `---` rule or heading.
fn rebuild_toc(document: &str) -> String {
    let lines: Vec<&str> = document.lines().collect();
    let Some(start) = lines.iter().position(|l| l.trim() == TOC_HEADING) else {
        return document.to_string();
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.trim() == "---" || l.starts_with('#'))
        .map_or(lines.len(), |offset| start + 1 + offset);

    let entries: Vec<String> = headings(document)
        .into_iter()
        .map(|h| format!("{}. {}", h.number, h.title))
        .collect();
    if entries.is_empty() {
        return document.to_string();
    }

    let mut rebuilt: Vec<&str> = lines[..=start].to_vec();
    rebuilt.push("");
    rebuilt.extend(entries.iter().map(String::as_str));
    rebuilt.push("");
    rebuilt.extend_from_slice(&lines[end..]);
    rebuilt.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::headings;
    use crate::validator::validate;

    #[test]
    fn skipped_number_is_renumbered() {
        let doc = "## 1. INTRODUCCIÓN\na\n## 2. OBJETIVOS\nb\n## 4. ALCANCE\nc";
        let report = validate(doc);
        let fixed = repair(doc, &report);

        let numbers: Vec<u32> = headings(&fixed).iter().map(|h| h.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(fixed.contains("## 3. ALCANCE\nc"));
        assert!(validate(&fixed).numbering.valid);
    }

    #[test]
    fn subsections_follow_their_chapter() {
        let doc = "## 2. A\nx\n### 5.1 uno\n### 5.3 dos\n## 7. B\ny\n### 1.1 tres";
        let fixed = renumber(doc);
        assert_eq!(
            fixed,
            "## 1. A\nx\n### 1.1 uno\n### 1.2 dos\n## 2. B\ny\n### 2.1 tres"
        );
    }

    #[test]
    fn table_of_contents_follows_renumbered_headings() {
        let doc = "# PROPUESTA\n\n## Tabla de Contenido\n\n1. A\n1. Detalle\n2. B\n\n---\n\n\
                   ## 1. A\nx\n## 1. Detalle\ny\n## 2. B\nz\n\n---\n\n**Versión 1.0**";
        let fixed = repair(doc, &validate(doc));
        assert_eq!(
            fixed,
            "# PROPUESTA\n\n## Tabla de Contenido\n\n1. A\n2. Detalle\n3. B\n\n---\n\n\
             ## 1. A\nx\n## 2. Detalle\ny\n## 3. B\nz\n\n---\n\n**Versión 1.0**"
        );
    }

    #[test]
    fn document_without_toc_is_only_renumbered() {
        assert_eq!(renumber("## 3. A\nx"), "## 1. A\nx");
    }

    #[test]
    fn valid_numbering_only_cleans() {
        let doc = "## 1. A\n<think>plan</think>texto\n\n\n\nmás";
        let report = validate(doc);
        assert!(report.numbering.valid);
        assert_eq!(repair(doc, &report), "## 1. A\ntexto\n\nmás");
    }

    #[test]
    fn missing_sections_are_not_invented() {
        let doc = "## 1. INTRODUCCIÓN\ntexto";
        let report = validate(doc);
        let fixed = repair(doc, &report);
        assert!(!validate(&fixed).structure.valid);
    }
}
