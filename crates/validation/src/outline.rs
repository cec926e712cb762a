//! Outline repair.
//!
//! The planning step asks the backend for a JSON object mapping section
//! keys to descriptions. Answers arrive wrapped in prose, reasoning tags,
//! code fences, or with trailing commas. Strategies are tried in order until
//! one parses; if none does, the default outline is used. A parsed outline
//! that lacks a required identity gets a `{KEY}_SECCION` entry appended.

use crate::grammar::{is_fence, strip_think};
use draftwright_core::{SectionIdentity, SectionSpec};
use regex_lite::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, warn};

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

const DEFAULT_OUTLINE: [(&str, &str); 13] = [
    ("INTRODUCCION_Y_CONTEXTO", "Contexto del proyecto y problema que se busca resolver"),
    ("OBJETIVOS_GENERALES", "Objetivo general del proyecto"),
    ("OBJETIVOS_ESPECIFICOS", "Objetivos específicos y medibles del proyecto"),
    ("ALCANCE_DEL_TRABAJO", "Trabajo incluido y excluido del alcance"),
    ("METODOLOGIA_PROPUESTA", "Metodología de desarrollo del proyecto"),
    ("PLAN_DE_TRABAJO_Y_CRONOGRAMA", "Fases, actividades y tiempos del proyecto"),
    ("ENTREGABLES", "Entregables del proyecto con su descripción"),
    ("RECURSOS_HUMANOS_Y_TECNICOS", "Equipo, roles y recursos técnicos asignados"),
    ("GESTION_DE_RIESGOS", "Riesgos identificados y estrategias de mitigación"),
    ("PLAN_DE_CALIDAD", "Aseguramiento de la calidad y estándares aplicados"),
    ("NORMATIVAS_Y_ESTANDARES_APLICABLES", "Normativas y estándares que el proyecto cumple"),
    ("EXPERIENCIA_RELEVANTE", "Proyectos similares y capacidades demostradas"),
    ("ANEXOS_TECNICOS", "Documentación técnica complementaria"),
];

/// Parsing attempts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineStrategy {
    /// The answer as-is
    Verbatim,
    /// Reasoning spans, fence lines, and text outside the outer braces removed
    Unwrapped,
    /// Unwrapped, then commas before `}` / `]` removed
    TrailingCommasRemoved,
}

impl OutlineStrategy {
    pub const ORDER: [OutlineStrategy; 3] = [
        OutlineStrategy::Verbatim,
        OutlineStrategy::Unwrapped,
        OutlineStrategy::TrailingCommasRemoved,
    ];

    fn candidate(self, raw: &str) -> Option<String> {
        match self {
            OutlineStrategy::Verbatim => Some(raw.trim().to_string()),
            OutlineStrategy::Unwrapped => unwrap(raw),
            OutlineStrategy::TrailingCommasRemoved => {
                unwrap(raw).map(|text| TRAILING_COMMA.replace_all(&text, "$1").into_owned())
            }
        }
    }
}

/// A usable outline and how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineRepair {
    /// `(key, description)` in outline order
    pub entries: Vec<(String, String)>,
    /// Strategy that parsed the answer; `None` when the default outline was used
    pub strategy: Option<OutlineStrategy>,
    /// Keys appended for missing required identities
    pub appended: Vec<String>,
}

impl OutlineRepair {
    pub fn is_default(&self) -> bool {
        self.strategy.is_none()
    }

    pub fn sections(&self) -> Vec<SectionSpec> {
        SectionSpec::outline(self.entries.iter().cloned())
    }

    /// The outline as a JSON object, keys in order.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

/// The fixed outline used when the backend answer cannot be parsed.
pub fn default_outline() -> Vec<(String, String)> {
    DEFAULT_OUTLINE
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The slice from the first `{` to the last `}`, inclusive.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Turn a backend outline answer into a usable outline. Never fails.
pub fn repair_outline(raw: &str) -> OutlineRepair {
    for strategy in OutlineStrategy::ORDER {
        let Some(candidate) = strategy.candidate(raw) else {
            continue;
        };
        if let Some(mut entries) = parse_entries(&candidate) {
            let appended = append_missing(&mut entries);
            if !appended.is_empty() {
                warn!(missing = ?appended, "Outline lacked required sections, appended defaults");
            }
            debug!(?strategy, sections = entries.len(), "Outline parsed");
            return OutlineRepair {
                entries,
                strategy: Some(strategy),
                appended,
            };
        }
    }

    warn!("Outline could not be parsed, using the default outline");
    OutlineRepair {
        entries: default_outline(),
        strategy: None,
        appended: Vec::new(),
    }
}

fn unwrap(raw: &str) -> Option<String> {
    let without_think = strip_think(raw);
    let without_fences: String = without_think
        .lines()
        .filter(|line| !is_fence(line))
        .collect::<Vec<_>>()
        .join("\n");
    extract_json_object(&without_fences).map(str::to_string)
}

/// A non-empty JSON object with non-blank keys; non-string values are kept
/// in their JSON form.
fn parse_entries(candidate: &str) -> Option<Vec<(String, String)>> {
    let Value::Object(map) = serde_json::from_str::<Value>(candidate).ok()? else {
        return None;
    };
    let entries: Vec<(String, String)> = map
        .into_iter()
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| {
            let description = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key.trim().to_string(), description)
        })
        .collect();
    (!entries.is_empty()).then_some(entries)
}

fn append_missing(entries: &mut Vec<(String, String)>) -> Vec<String> {
    let missing: Vec<SectionIdentity> = SectionIdentity::required()
        .filter(|identity| !entries.iter().any(|(key, _)| identity.matches(key)))
        .collect();

    missing
        .into_iter()
        .map(|identity| {
            let key = format!("{}_SECCION", identity.outline_key());
            entries.push((key.clone(), identity.default_description().to_string()));
            key
        })
        .collect()
}
