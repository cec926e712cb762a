//! Document chunker.
//!
//! Splits a document into size-bounded passages, trying three strategies in
//! order:
//!
//! 1. **Headings**: the first heading kind found in the document
//!    (markdown `#`, numbered `3.` / `3.2`, ALL-CAPS title line, `Label:`
//!    line) defines the units; units are coalesced up to `target_size`.
//! 2. **Paragraphs**: blank-line separated blocks, coalesced the same way,
//!    each new chunk starting with the `overlap`-character tail of the
//!    previous one.
//! 3. **Fixed width**: `target_size` windows with a stride of
//!    `target_size - overlap`.
//!
//! Chunks whose trimmed length is under `min_chars` are dropped. Every size
//! is counted in characters.

use draftwright_config::ChunkingConfig;
use draftwright_core::error::{Error, Result};
use regex_lite::Regex;
use std::sync::LazyLock;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+\S").expect("valid regex"));
static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.)+\d*\s+\S").expect("valid regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const MAX_TITLE_CHARS: usize = 100;

/// Heading kinds in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeadingKind {
    Markdown,
    Numbered,
    AllCaps,
    Label,
}

impl HeadingKind {
    const PRIORITY: [HeadingKind; 4] = [
        HeadingKind::Markdown,
        HeadingKind::Numbered,
        HeadingKind::AllCaps,
        HeadingKind::Label,
    ];

    fn matches(self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || line.chars().count() > MAX_TITLE_CHARS {
            return false;
        }
        match self {
            HeadingKind::Markdown => MARKDOWN_HEADING.is_match(line),
            HeadingKind::Numbered => NUMBERED_HEADING.is_match(line),
            HeadingKind::AllCaps => {
                let letters = line.chars().filter(|c| c.is_alphabetic()).count();
                letters >= 3 && !line.chars().any(char::is_lowercase) && !line.ends_with('.')
            }
            HeadingKind::Label => {
                line.ends_with(':') && !line.starts_with(['-', '*', '•']) && line.chars().count() > 1
            }
        }
    }
}

/// Splits documents into passages.
#[derive(Debug, Clone)]
pub struct Chunker {
    target_size: usize,
    overlap: usize,
    min_chars: usize,
}

impl Chunker {
    /// Requires `0 < overlap < target_size`.
    pub fn new(target_size: usize, overlap: usize, min_chars: usize) -> Result<Self> {
        if overlap == 0 || overlap >= target_size {
            return Err(Error::Config {
                message: format!(
                    "chunk overlap must satisfy 0 < overlap < target_size (got {overlap} / {target_size})"
                ),
            });
        }
        Ok(Self {
            target_size,
            overlap,
            min_chars,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.target_size, config.overlap, config.min_chars)
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    /// Chunk a document. Empty or whitespace-only input yields no chunks.
    pub fn chunk(&self, document: &str) -> Vec<String> {
        if document.trim().is_empty() {
            return Vec::new();
        }
        let text = document.replace("\r\n", "\n");

        let chunks = if let Some(units) = split_on_headings(&text) {
            self.coalesce_units(units)
        } else if PARAGRAPH_BREAK.is_match(text.trim()) {
            self.coalesce_paragraphs(&text)
        } else {
            self.fixed_width(text.trim())
        };

        chunks
            .into_iter()
            .filter(|c| c.trim().chars().count() >= self.min_chars)
            .collect()
    }

    fn coalesce_units(&self, units: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for unit in units {
            for piece in slice_chars(unit.trim(), self.target_size, self.target_size) {
                let needed = joined_len(&current, &piece);
                if !current.is_empty() && needed > self.target_size {
                    chunks.push(std::mem::take(&mut current));
                }
                if !current.is_empty() {
                    current.push_str(PARAGRAPH_SEPARATOR);
                }
                current.push_str(&piece);
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn coalesce_paragraphs(&self, text: &str) -> Vec<String> {
        // Room left for new content once a chunk starts with an overlap tail.
        let max_piece = self
            .target_size
            .saturating_sub(self.overlap + PARAGRAPH_SEPARATOR.len())
            .max(1);

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut has_new_content = false;

        for paragraph in PARAGRAPH_BREAK.split(text) {
            for piece in slice_chars(paragraph.trim(), max_piece, max_piece) {
                if has_new_content && joined_len(&current, &piece) > self.target_size {
                    let done = current.trim().to_string();
                    current = overlap_tail(&done, self.overlap);
                    chunks.push(done);
                    has_new_content = false;
                }
                if !current.is_empty() {
                    current.push_str(PARAGRAPH_SEPARATOR);
                }
                current.push_str(&piece);
                has_new_content = true;
            }
        }
        if has_new_content {
            chunks.push(current.trim().to_string());
        }
        chunks
    }

    fn fixed_width(&self, text: &str) -> Vec<String> {
        slice_chars(text, self.target_size, self.target_size - self.overlap)
    }
}

/// Split on the highest-priority heading kind present. Text before the
/// first heading is kept as its own unit.
fn split_on_headings(text: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = text.lines().collect();

    HeadingKind::PRIORITY.into_iter().find_map(|kind| {
        let starts: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| kind.matches(line))
            .map(|(i, _)| i)
            .collect();
        if starts.is_empty() {
            return None;
        }

        let mut bounds = Vec::with_capacity(starts.len() + 1);
        if starts[0] > 0 {
            bounds.push(0);
        }
        bounds.extend(starts.iter().copied());

        let units = bounds
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = bounds.get(i + 1).copied().unwrap_or(lines.len());
                lines[start..end].join("\n")
            })
            .filter(|unit| !unit.trim().is_empty())
            .collect();
        Some(units)
    })
}

/// Character windows of `size`, advancing by `stride`; the last window ends
/// at the end of the text.
fn slice_chars(text: &str, size: usize, stride: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= size {
        return if text.is_empty() { Vec::new() } else { vec![text.to_string()] };
    }

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            windows.push(window.trim().to_string());
        }
        if end == chars.len() {
            break;
        }
        start += stride.max(1);
    }
    windows
}

/// The last `overlap` characters of a chunk, without leading whitespace.
fn overlap_tail(chunk: &str, overlap: usize) -> String {
    let count = chunk.chars().count();
    chunk
        .chars()
        .skip(count.saturating_sub(overlap))
        .collect::<String>()
        .trim_start()
        .to_string()
}

fn joined_len(current: &str, piece: &str) -> usize {
    let piece_len = piece.chars().count();
    if current.is_empty() {
        piece_len
    } else {
        current.chars().count() + PARAGRAPH_SEPARATOR.len() + piece_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(seed: usize, words: usize) -> String {
        (0..words)
            .map(|i| format!("palabra{}", seed * 1000 + i))
            .collect::<Vec<_>>()
            .join(" ")
            + "."
    }

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn empty_input_yields_nothing() {
        let chunker = Chunker::new(1000, 200, 100).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t \n").is_empty());
    }

    #[test]
    fn invalid_overlap_rejected() {
        assert!(Chunker::new(100, 0, 10).is_err());
        assert!(Chunker::new(100, 100, 10).is_err());
        assert!(Chunker::new(100, 150, 10).is_err());
    }

    #[test]
    fn markdown_headings_define_units() {
        let chunker = Chunker::new(120, 20, 5).unwrap();
        let doc = format!(
            "# Introducción\n{}\n# Alcance\n{}\n",
            "a".repeat(90),
            "b".repeat(90)
        );
        let chunks = chunker.chunk(&doc);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# Introducción"));
        assert!(chunks[1].starts_with("# Alcance"));
    }

    #[test]
    fn small_units_are_coalesced() {
        let chunker = Chunker::new(1000, 200, 5).unwrap();
        let doc = "1. Objetivos\nUno.\n2. Alcance\nDos.\n3. Metodología\nTres.";
        let chunks = chunker.chunk(doc);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("2. Alcance"));
        assert!(chunks[0].contains("Tres."));
    }

    #[test]
    fn preamble_before_first_heading_is_kept() {
        let chunker = Chunker::new(100, 10, 5).unwrap();
        let doc = format!("{}\nALCANCE DEL SERVICIO\n{}", "p".repeat(50), "q".repeat(50));
        let chunks = chunker.chunk(&doc);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with('p'));
        assert!(chunks[1].starts_with("ALCANCE DEL SERVICIO"));
    }

    #[test]
    fn markdown_wins_over_label_lines() {
        let chunker = Chunker::new(50, 10, 1).unwrap();
        let doc = "## Riesgos\nNota:\nriesgo uno\n## Calidad\nNota:\ncalidad uno";
        let chunks = chunker.chunk(doc);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].contains("Nota:\nriesgo uno"));
    }

    #[test]
    fn no_chunk_exceeds_target_size() {
        let chunker = Chunker::new(100, 20, 1).unwrap();
        let doc = format!("# Uno\n{}\n# Dos\n{}", "x".repeat(250), "y ".repeat(80));
        for chunk in chunker.chunk(&doc) {
            assert!(chunk.chars().count() <= 100, "{} chars", chunk.chars().count());
        }
    }

    #[test]
    fn paragraphs_carry_overlap_and_reconstruct_content() {
        let chunker = Chunker::new(300, 50, 10).unwrap();
        let paragraphs: Vec<String> = (0..8).map(|i| sentence(i, 12)).collect();
        let doc = paragraphs.join("\n\n");

        let chunks = chunker.chunk(&doc);
        assert!(chunks.len() > 1);

        let mut rebuilt = chunks[0].clone();
        for pair in chunks.windows(2) {
            assert!(pair[1].chars().count() <= 300);
            let tail = overlap_tail(&pair[0], 50);
            let rest = pair[1]
                .strip_prefix(tail.as_str())
                .expect("chunk starts with the previous chunk's tail");
            rebuilt.push_str(rest);
        }
        assert_eq!(squash(&rebuilt), squash(&doc));
    }

    #[test]
    fn oversized_paragraph_is_sliced() {
        let chunker = Chunker::new(100, 20, 1).unwrap();
        let doc = format!("{}\n\n{}", "m".repeat(300), "n".repeat(30));
        let chunks = chunker.chunk(&doc);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        let total: usize = chunks.iter().map(|c| c.matches('m').count()).sum();
        assert!(total >= 300);
    }

    #[test]
    fn fixed_width_without_breaks() {
        let chunker = Chunker::new(100, 20, 1).unwrap();
        let doc = "z".repeat(250);
        let chunks = chunker.chunk(&doc);
        // windows start at 0, 80, 160; the third reaches the end
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[2].len(), 90);
    }

    #[test]
    fn short_chunks_are_dropped() {
        let chunker = Chunker::new(1000, 200, 100).unwrap();
        assert!(chunker.chunk("# Título\nmuy corto").is_empty());
    }

    #[test]
    fn sizes_count_characters_not_bytes() {
        let chunker = Chunker::new(10, 2, 1).unwrap();
        let doc = "ñ".repeat(10);
        let chunks = chunker.chunk(&doc);
        assert_eq!(chunks, vec![doc]);
    }

    #[test]
    fn leading_figures_do_not_split_paragraphs() {
        let chunker = Chunker::new(200, 40, 10).unwrap();
        let doc = "3 ingenieros asignados al frente norte.\n\n2025 fue el año de la primera fase del despliegue.";
        assert_eq!(split_on_headings(doc), None);
        assert_eq!(chunker.chunk(doc), vec![doc.to_string()]);
    }

    #[test]
    fn heading_kinds() {
        assert!(HeadingKind::Markdown.matches("### Plan de trabajo"));
        assert!(!HeadingKind::Markdown.matches("#hashtag"));
        assert!(HeadingKind::Numbered.matches("4.2 Cronograma"));
        assert!(HeadingKind::Numbered.matches("5. Entregables"));
        assert!(HeadingKind::Numbered.matches("3.1. Alcance"));
        assert!(!HeadingKind::Numbered.matches("3 ingenieros asignados"));
        assert!(!HeadingKind::Numbered.matches("2025 fue un año de transición"));
        assert!(HeadingKind::AllCaps.matches("METODOLOGÍA PROPUESTA"));
        assert!(!HeadingKind::AllCaps.matches("ISO 9001."));
        assert!(!HeadingKind::AllCaps.matches("Ok"));
        assert!(HeadingKind::Label.matches("Entregables previstos:"));
        assert!(!HeadingKind::Label.matches("- item:"));
    }
}
