//! Requirement info: the source document a proposal answers.
//!
//! Upstream analysis either produced a structured record or it didn't, so
//! the input is a tagged variant and each capability (excerpting, field
//! lookup, prompt rendering) is a method that handles both cases once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Values upstream analysis uses to mark a field it could not fill.
const UNSPECIFIED_MARKERS: &[&str] = &["no especificado", "no especificada", "unspecified", "n/a"];

/// The requirement a proposal is synthesized from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequirementInfo {
    /// A parsed key-value record.
    Structured(Map<String, Value>),
    /// Raw requirement text.
    FreeText(String),
}

impl RequirementInfo {
    /// Parse raw input: a JSON object becomes `Structured`, anything else
    /// (including JSON arrays and scalars) is kept as `FreeText`.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Object(map)) => RequirementInfo::Structured(map),
            _ => RequirementInfo::FreeText(raw.to_string()),
        }
    }

    /// True when there is nothing to synthesize from.
    pub fn is_empty(&self) -> bool {
        match self {
            RequirementInfo::Structured(map) => map.is_empty(),
            RequirementInfo::FreeText(text) => text.trim().is_empty(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, RequirementInfo::Structured(_))
    }

    /// First usable value among `names` (structured input only).
    ///
    /// Strings are trimmed; arrays are joined with `", "`; values marked as
    /// unspecified count as absent.
    pub fn field(&self, names: &[&str]) -> Option<String> {
        let RequirementInfo::Structured(map) = self else {
            return None;
        };
        names
            .iter()
            .filter_map(|name| map.get(*name))
            .filter_map(render_value)
            .find(|value| !is_unspecified(value))
    }

    /// Raw value of a structured field.
    pub fn raw_field(&self, name: &str) -> Option<&Value> {
        match self {
            RequirementInfo::Structured(map) => map.get(name),
            RequirementInfo::FreeText(_) => None,
        }
    }

    /// Text form handed to prompts: pretty JSON or the free text itself.
    pub fn as_prompt_text(&self) -> String {
        match self {
            RequirementInfo::Structured(map) => serde_json::to_string_pretty(map)
                .unwrap_or_else(|_| Value::Object(map.clone()).to_string()),
            RequirementInfo::FreeText(text) => text.trim().to_string(),
        }
    }

    /// Prompt text truncated to `max_chars` characters.
    pub fn excerpt(&self, max_chars: usize) -> String {
        truncate_chars(&self.as_prompt_text(), max_chars).to_string()
    }

    /// The free text, if this is the free-text variant.
    pub fn free_text(&self) -> Option<&str> {
        match self {
            RequirementInfo::FreeText(text) => Some(text),
            RequirementInfo::Structured(_) => None,
        }
    }
}

/// True when a value is one of the "not specified" markers.
pub fn is_unspecified(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    lowered.is_empty() || UNSPECIFIED_MARKERS.contains(&lowered.as_str())
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_value).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_parses_as_structured() {
        let info = RequirementInfo::parse(r#"{"titulo_proyecto": "Puente", "cliente": "MOP"}"#);
        assert!(info.is_structured());
        assert_eq!(info.field(&["titulo_proyecto"]).as_deref(), Some("Puente"));
    }

    #[test]
    fn other_input_is_free_text() {
        assert!(!RequirementInfo::parse("Se requiere un estudio").is_structured());
        assert!(!RequirementInfo::parse("[1, 2]").is_structured());
    }

    #[test]
    fn field_skips_unspecified_values() {
        let info = RequirementInfo::parse(
            r#"{"fecha": "No especificado", "fecha_inicio": "2026-03-01"}"#,
        );
        assert_eq!(
            info.field(&["fecha", "fecha_inicio"]).as_deref(),
            Some("2026-03-01")
        );
        assert_eq!(info.field(&["fecha"]), None);
    }

    #[test]
    fn field_joins_arrays() {
        let info = RequirementInfo::parse(r#"{"tecnologias": ["Rust", "PostGIS"]}"#);
        assert_eq!(info.field(&["tecnologias"]).as_deref(), Some("Rust, PostGIS"));
    }

    #[test]
    fn free_text_has_no_fields() {
        let info = RequirementInfo::FreeText("cliente: X".into());
        assert_eq!(info.field(&["cliente"]), None);
        assert_eq!(info.free_text(), Some("cliente: X"));
    }

    #[test]
    fn emptiness() {
        assert!(RequirementInfo::FreeText("  \n".into()).is_empty());
        assert!(RequirementInfo::Structured(Map::new()).is_empty());
        assert!(!RequirementInfo::FreeText("x".into()).is_empty());
    }

    #[test]
    fn excerpt_counts_characters() {
        let info = RequirementInfo::FreeText("ñandú ñandú".into());
        assert_eq!(info.excerpt(5), "ñandú");
        assert_eq!(info.excerpt(100), "ñandú ñandú");
    }

    #[test]
    fn truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("áéí", 2), "áé");
        assert_eq!(truncate_chars("", 3), "");
    }
}
