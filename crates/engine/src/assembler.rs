//! Proposal assembler.
//!
//! A pure function over the generated sections and project metadata:
//! title block, table of contents, sections in order, footer, then a final
//! normalization and subsection-numbering pass. Callable without the
//! orchestrator.

use crate::metadata::ProjectMetadata;
use draftwright_validation::grammar::{self, format_heading, format_subsection};
use draftwright_validation::normalize;

const VERSION_MARKER: &str = "**Versión 1.0**";

#[derive(Debug, Clone)]
pub struct ProposalAssembler {
    document_code: String,
}

impl ProposalAssembler {
    pub fn new(document_code: impl Into<String>) -> Self {
        Self {
            document_code: document_code.into(),
        }
    }

    pub fn document_code(&self) -> &str {
        &self.document_code
    }

    /// Assemble the final document.
    pub fn assemble(&self, sections: &[String], metadata: &ProjectMetadata) -> String {
        let sections: Vec<String> = sections
            .iter()
            .enumerate()
            .map(|(i, s)| ensure_numbered_heading(s.trim(), i + 1))
            .collect();

        let mut document = self.title_block(metadata);
        document.push_str(grammar::TOC_HEADING);
        document.push_str("\n\n");
        document.push_str(&table_of_contents(&sections).join("\n"));
        document.push_str("\n\n---\n\n");
        document.push_str(&sections.join("\n\n"));
        document.push_str("\n\n---\n\n");
        document.push_str(VERSION_MARKER);
        document.push_str(&format!(
            "\n\n**Documento preparado en conformidad con los requisitos del documento {}**",
            self.document_code
        ));

        number_subsections(&normalize(&document))
    }

    fn title_block(&self, metadata: &ProjectMetadata) -> String {
        format!(
            "# PROPUESTA TÉCNICA\n\
             **Documento: {code}**\n\
             **Fecha: {date}**\n\
             **Proyecto: {title}**\n\
             **Cliente: {client}**\n\n\
             ---\n\n",
            code = self.document_code,
            date = metadata.date,
            title = metadata.title,
            client = metadata.client,
        )
    }
}

/// One TOC line per numbered heading; a section without one contributes
/// `"{position}. {first line}"`.
pub fn table_of_contents(sections: &[String]) -> Vec<String> {
    sections
        .iter()
        .enumerate()
        .flat_map(|(i, section)| {
            let headings = grammar::headings(section);
            if headings.is_empty() {
                vec![format!("{}. {}", i + 1, first_line_title(section))]
            } else {
                headings
                    .into_iter()
                    .map(|h| format!("{}. {}", h.number, h.title))
                    .collect()
            }
        })
        .collect()
}

fn first_line_title(section: &str) -> String {
    section
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches('#')
        .trim()
        .to_string()
}

/// Give a section whose first line is an unnumbered `#`/`##` heading the
/// number `position`. Other sections are returned unchanged.
fn ensure_numbered_heading(section: &str, position: usize) -> String {
    if !grammar::headings(section).is_empty() {
        return section.to_string();
    }
    let Some(first) = section.lines().next() else {
        return section.to_string();
    };
    if !first.starts_with('#') || first.starts_with("###") {
        return section.to_string();
    }

    let rest = &section[first.len()..];
    let number = u32::try_from(position).unwrap_or(u32::MAX);
    format!("{}{rest}", format_heading(number, &first_line_title(section)))
}

/// `### Title` under chapter N becomes `### N.k Title`, continuing after
/// any numbered subsections already present in that chapter.
pub fn number_subsections(document: &str) -> String {
    let mut chapter: Option<u32> = None;
    let mut last_sub = 0u32;

    document
        .lines()
        .map(|line| {
            if let Some((number, _)) = grammar::parse_heading(line) {
                chapter = Some(number);
                last_sub = 0;
                return line.to_string();
            }
            let Some(ch) = chapter else {
                return line.to_string();
            };
            if let Some((c, s, _)) = grammar::parse_subsection(line) {
                if c == ch {
                    last_sub = s;
                }
                return line.to_string();
            }
            match grammar::parse_unnumbered_subsection(line) {
                Some(title) => {
                    last_sub = last_sub.saturating_add(1);
                    format_subsection(ch, last_sub, title)
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ProjectMetadata {
        ProjectMetadata {
            title: "X".into(),
            client: "Y".into(),
            date: "01/01/2026".into(),
        }
    }

    #[test]
    fn single_section_document() {
        let doc = ProposalAssembler::new("PKS-537 RQ-01").assemble(&["## 1. INTRO\nbody".to_string()], &meta());

        assert!(doc.starts_with("# PROPUESTA TÉCNICA\n**Documento: PKS-537 RQ-01**"));
        assert!(doc.contains("**Proyecto: X**"));
        assert!(doc.contains("**Cliente: Y**"));
        assert!(doc.contains("## Tabla de Contenido\n\n1. INTRO\n"));
        assert!(doc.contains("## 1. INTRO\nbody"));
        assert!(doc.contains("**Versión 1.0**"));
        assert!(doc.ends_with("requisitos del documento PKS-537 RQ-01**"));
    }

    #[test]
    fn toc_falls_back_to_first_line() {
        let sections = vec![
            "## 1. INTRODUCCIÓN\ntexto".to_string(),
            "Resumen ejecutivo\ntexto".to_string(),
            "## 3. ALCANCE\ntexto\n## 4. EXTRA\nmás".to_string(),
        ];
        assert_eq!(
            table_of_contents(&sections),
            vec!["1. INTRODUCCIÓN", "2. Resumen ejecutivo", "3. ALCANCE", "4. EXTRA"]
        );
    }

    #[test]
    fn unnumbered_heading_gets_its_position() {
        let doc = ProposalAssembler::new("C").assemble(
            &["## 1. A\nuno".to_string(), "## Metodología\ndos".to_string()],
            &meta(),
        );
        assert!(doc.contains("## 2. Metodología\ndos"));
        assert!(doc.contains("\n2. Metodología\n"));
    }

    #[test]
    fn subsections_are_numbered_per_chapter() {
        let doc = "## 1. A\n### Contexto\nx\n## 2. B\n### 2.1 Ya numerada\n### Siguiente\n### Otra";
        assert_eq!(
            number_subsections(doc),
            "## 1. A\n### 1.1 Contexto\nx\n## 2. B\n### 2.1 Ya numerada\n### 2.2 Siguiente\n### 2.3 Otra"
        );
    }

    #[test]
    fn subsection_numbering_saturates() {
        let max = u32::MAX;
        let doc = format!("## 1. A\n### 1.{max} Última\n### Otra");
        assert_eq!(
            number_subsections(&doc),
            format!("## 1. A\n### 1.{max} Última\n### 1.{max} Otra")
        );
    }

    #[test]
    fn assembly_cleans_generated_noise() {
        let doc = ProposalAssembler::new("C").assemble(
            &["## 1. A\n<think>x</think>\n\n\n\n* punto".to_string()],
            &meta(),
        );
        assert!(!doc.contains("<think>"));
        assert!(doc.contains("## 1. A\n\n- punto"));
    }
}
