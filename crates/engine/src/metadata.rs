//! Project metadata for the title block and prompts.
//!
//! Structured requirements supply `titulo_proyecto` / `cliente` / a date
//! field directly. Anything still missing is scanned for in the free-text
//! requirement and then in the first generated section.

use draftwright_core::RequirementInfo;
use draftwright_core::requirement::is_unspecified;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

pub const DEFAULT_TITLE: &str = "Proyecto No Especificado";
pub const DEFAULT_CLIENT: &str = "Cliente No Especificado";

const TITLE_FIELDS: &[&str] = &["titulo_proyecto", "titulo", "nombre_proyecto", "project_title", "title"];
const CLIENT_FIELDS: &[&str] = &["cliente", "entidad", "client"];
const DATE_FIELDS: &[&str] = &["fecha", "fecha_inicio", "plazos", "cronograma"];

static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)(?:t[ií]tulo|nombre)\s+del\s+proyecto\s*:\s*(.+)$").expect("valid regex")
});
static CLIENT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s*\-]*(?:cliente|empresa|entidad)\s*:\s*(.+)$").expect("valid regex")
});
static DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[\s*\-]*fecha[^:\n]*:\s*(.+)$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub title: String,
    pub client: String,
    pub date: String,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.into(),
            client: DEFAULT_CLIENT.into(),
            date: chrono::Local::now().format("%d/%m/%Y").to_string(),
        }
    }
}

impl ProjectMetadata {
    /// Metadata from the requirement, falling back to a scan of
    /// `first_section` for anything the requirement does not state.
    pub fn extract(requirement: &RequirementInfo, first_section: Option<&str>) -> Self {
        let mut title = requirement.field(TITLE_FIELDS);
        let mut client = requirement.field(CLIENT_FIELDS);
        let mut date = requirement.field(DATE_FIELDS);

        let texts = requirement.free_text().into_iter().chain(first_section);
        for text in texts {
            title = title.or_else(|| scan(&TITLE_LINE, text));
            client = client.or_else(|| scan(&CLIENT_LINE, text));
            date = date.or_else(|| scan(&DATE_LINE, text));
        }

        let defaults = Self::default();
        Self {
            title: title.unwrap_or(defaults.title),
            client: client.unwrap_or(defaults.client),
            date: date.unwrap_or(defaults.date),
        }
    }
}

fn scan(pattern: &Regex, text: &str) -> Option<String> {
    let value = pattern.captures(text)?.get(1)?.as_str();
    let value = value.trim().trim_matches('*').trim();
    (!is_unspecified(value)).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_fields_win() {
        let info = RequirementInfo::parse(
            r#"{"titulo_proyecto": "Portal Ciudadano", "cliente": "Municipio", "fecha_inicio": "01/03/2026"}"#,
        );
        let meta = ProjectMetadata::extract(&info, Some("Cliente: Otro"));
        assert_eq!(meta.title, "Portal Ciudadano");
        assert_eq!(meta.client, "Municipio");
        assert_eq!(meta.date, "01/03/2026");
    }

    #[test]
    fn unspecified_fields_fall_back_to_first_section() {
        let info = RequirementInfo::parse(r#"{"titulo_proyecto": "No especificado"}"#);
        let section = "## 1. INTRODUCCIÓN\n\nTítulo del proyecto: Red Hídrica\n**Cliente:** Agua Andina";
        let meta = ProjectMetadata::extract(&info, Some(section));
        assert_eq!(meta.title, "Red Hídrica");
        assert_eq!(meta.client, "Agua Andina");
    }

    #[test]
    fn free_text_is_scanned_before_sections() {
        let info = RequirementInfo::parse("TÉRMINOS DE REFERENCIA\nNombre del proyecto: Puente Sur\nEntidad: MOP\nFecha de emisión: 12/05/2026");
        let meta = ProjectMetadata::extract(&info, Some("Cliente: Ignorado"));
        assert_eq!(meta.title, "Puente Sur");
        assert_eq!(meta.client, "MOP");
        assert_eq!(meta.date, "12/05/2026");
    }

    #[test]
    fn defaults_when_nothing_is_found() {
        let meta = ProjectMetadata::extract(&RequirementInfo::parse("texto sin datos"), None);
        assert_eq!(meta.title, DEFAULT_TITLE);
        assert_eq!(meta.client, DEFAULT_CLIENT);
        assert_eq!(meta.date.len(), 10);
    }
}
