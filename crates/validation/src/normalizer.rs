//! Content normalizer.
//!
//! `normalize` is pure and idempotent. Steps, in order:
//!
//! 1. drop `<think>…</think>` reasoning spans
//! 2. drop characters outside the allow-list (non-Latin script runs)
//! 3. trim trailing whitespace on every line
//! 4. rewrite `*`, `•`, `·` bullets at line start to `- `
//! 5. collapse three or more newlines into one blank line
//! 6. trim the whole text

use crate::grammar::{is_allowed_char, strip_think};
use regex_lite::Regex;
use std::sync::LazyLock;

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)[*•·][ \t]+").expect("valid regex"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static LEADING_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,2}(?:[ \t][^\n]*)?(?:\n|$)").expect("valid regex"));
static INNER_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#{1,2}[ \t]+(?:\d+(?:\.\d+)*\.?[ \t]+)?(\S.*?)[ \t]*$").expect("valid regex")
});

pub fn normalize(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = strip_think(&text);
    let text: String = text.chars().filter(|c| is_allowed_char(*c)).collect();
    // Dropping characters can splice a tag back together.
    let text = strip_think(&text);

    let text = text.lines().map(str::trim_end).collect::<Vec<_>>().join("\n");
    let text = BULLET.replace_all(&text, "${1}- ");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Normalize a generated section body and drop any `#` / `##` heading lines
/// it opens with; the caller writes its own heading. Later `#` / `##`
/// headings become unnumbered `###` subsections, so a body never opens a
/// new top-level chapter.
pub fn normalize_section_body(text: &str) -> String {
    let mut body = normalize(text);
    while let Some(found) = LEADING_HEADING.find(&body) {
        body = body[found.end()..].trim_start().to_string();
    }
    INNER_HEADING.replace_all(&body, "### ${1}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_reasoning_and_foreign_script() {
        let raw = "<think>\nprimero pienso\n</think>\nEl sistema 使用 usará PostgreSQL.";
        assert_eq!(normalize(raw), "El sistema  usará PostgreSQL.");
    }

    #[test]
    fn keeps_spanish_and_typography() {
        let raw = "Año “2025” – inversión de 10 000 € … ¿listo?";
        assert_eq!(normalize(raw), raw);
    }

    #[test]
    fn collapses_blank_lines_and_trailing_space() {
        let raw = "uno   \n\n\n\n  \ndos\t\n\n\ntres";
        assert_eq!(normalize(raw), "uno\n\ndos\n\ntres");
    }

    #[test]
    fn canonical_bullets() {
        let raw = "* uno\n  • dos\n·\ttres\n**negrita** intacta\n- cuatro";
        assert_eq!(
            normalize(raw),
            "- uno\n  - dos\n- tres\n**negrita** intacta\n- cuatro"
        );
    }

    #[test]
    fn idempotent_on_awkward_inputs() {
        let samples = [
            "",
            "   ",
            "<thi中nk>oculto</think> visible",
            "* \n\n\n\n•   x  \r\n\r\n\r\n\r\n## 1. T",
            "texto\n\n\n<think>a</think>\n\n\nfin",
            "  * lista inicial\n",
            "<think>sin cierre",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn section_body_drops_leading_headings() {
        let raw = "## 4. METODOLOGÍA\n# Metodología\n\n### 4.1 Enfoque\nScrum.";
        assert_eq!(normalize_section_body(raw), "### 4.1 Enfoque\nScrum.");
    }

    #[test]
    fn section_body_demotes_inner_headings() {
        let raw = "Texto directo.\n\n## 2. Otro\nmás\n# Aparte\n### 1.2 Queda\n#etiqueta";
        assert_eq!(
            normalize_section_body(raw),
            "Texto directo.\n\n### Otro\nmás\n### Aparte\n### 1.2 Queda\n#etiqueta"
        );
    }
}
