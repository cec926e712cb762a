//! Heading grammar shared by validation, repair, and assembly.
//!
//! Proposal text is markdown with two numbered heading levels:
//!
//! ```text
//! ## 3. ALCANCE          top-level section
//! ### 3.2 Exclusiones    subsection, keyed to its chapter
//! ```
//!
//! Anything that detects or rewrites those labels goes through the parsers
//! and formatters here.

use regex_lite::Regex;
use std::sync::LazyLock;

static TOP_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##[ \t]+(\d+)\.(?:[ \t]+(.*?))?[ \t]*$").expect("valid regex")
});
static SUBSECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###[ \t]+(\d+)\.(\d+)\.?(?:[ \t]+(.*?))?[ \t]*$").expect("valid regex")
});
static UNNUMBERED_SUBSECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^###[ \t]+([^\d\s].*?)[ \t]*$").expect("valid regex"));
static THINK_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("valid regex"));
static THINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?think>").expect("valid regex"));

/// Opening tag of a reasoning span.
pub const THINK_OPEN: &str = "<think>";
/// Closing tag of a reasoning span.
pub const THINK_CLOSE: &str = "</think>";

/// Heading of the table of contents, whose entries read `N. TITLE`.
pub const TOC_HEADING: &str = "## Tabla de Contenido";

/// A `## N. TITLE` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Zero-based line index in the document
    pub line: usize,
    pub number: u32,
    pub title: String,
}

/// A `### C.N Title` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsection {
    pub line: usize,
    pub chapter: u32,
    pub number: u32,
    pub title: String,
}

impl Subsection {
    pub fn label(&self) -> String {
        format!("{}.{}", self.chapter, self.number)
    }
}

/// Parse a top-level numbered heading into `(number, title)`.
pub fn parse_heading(line: &str) -> Option<(u32, &str)> {
    let caps = TOP_HEADING.captures(line)?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    let title = caps.get(2).map_or("", |m| m.as_str());
    Some((number, title))
}

/// Parse a numbered subsection into `(chapter, number, title)`.
pub fn parse_subsection(line: &str) -> Option<(u32, u32, &str)> {
    let caps = SUBSECTION.captures(line)?;
    let chapter = caps.get(1)?.as_str().parse().ok()?;
    let number = caps.get(2)?.as_str().parse().ok()?;
    let title = caps.get(3).map_or("", |m| m.as_str());
    Some((chapter, number, title))
}

/// Title of a `### Title` line that carries no number.
pub fn parse_unnumbered_subsection(line: &str) -> Option<&str> {
    UNNUMBERED_SUBSECTION
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn format_heading(number: u32, title: &str) -> String {
    if title.is_empty() {
        format!("## {number}.")
    } else {
        format!("## {number}. {title}")
    }
}

pub fn format_subsection(chapter: u32, number: u32, title: &str) -> String {
    if title.is_empty() {
        format!("### {chapter}.{number}")
    } else {
        format!("### {chapter}.{number} {title}")
    }
}

/// All top-level headings, in document order.
pub fn headings(text: &str) -> Vec<Heading> {
    text.lines()
        .enumerate()
        .filter_map(|(line, content)| {
            parse_heading(content).map(|(number, title)| Heading {
                line,
                number,
                title: title.to_string(),
            })
        })
        .collect()
}

/// All numbered subsections, in document order.
pub fn subsections(text: &str) -> Vec<Subsection> {
    text.lines()
        .enumerate()
        .filter_map(|(line, content)| {
            parse_subsection(content).map(|(chapter, number, title)| Subsection {
                line,
                chapter,
                number,
                title: title.to_string(),
            })
        })
        .collect()
}

/// A fenced code block delimiter (opening or closing).
pub fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// A markdown table row.
pub fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Characters a proposal may contain: ASCII, the Latin-1 supplement, the
/// euro sign, and common typographic punctuation.
pub fn is_allowed_char(c: char) -> bool {
    c.is_ascii()
        || ('\u{00A1}'..='\u{00FF}').contains(&c)
        || matches!(
            c,
            '€' | '\u{2013}' | '\u{2014}' | '\u{2018}' | '\u{2019}' | '\u{201C}' | '\u{201D}' | '\u{2026}' | '\u{2022}'
        )
}

pub fn has_think_tags(text: &str) -> bool {
    text.contains(THINK_OPEN) || text.contains(THINK_CLOSE)
}

/// Remove reasoning spans with their content, then any stray tags, until
/// nothing changes. Spans are always removed before lone tags.
pub fn strip_think(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let without_spans = THINK_SPAN.replace_all(&current, "").into_owned();
        if without_spans != current {
            current = without_spans;
            continue;
        }
        let without_tags = THINK_TAG.replace_all(&current, "").into_owned();
        if without_tags == current {
            return current;
        }
        current = without_tags;
    }
}
