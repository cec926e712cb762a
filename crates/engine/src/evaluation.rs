//! Proposal evaluation.
//!
//! The assembled proposal is scored by the backend against criteria pulled
//! from the requirement. The backend answer must be a well-formed record
//! (score in `[0, 10]`, boolean compliance map); anything else is treated as
//! malformed output and the run degrades to a plain-text summary.

use crate::backend::Generator;
use crate::prompt::{self, PromptLimits};
use draftwright_core::requirement::{is_unspecified, truncate_chars};
use draftwright_core::{Error, RequirementInfo, Result};
use draftwright_validation::{extract_json_object, normalize};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

const TECHNOLOGY_FIELDS: &[&str] = &["tecnologias", "requisitos_tecnicos", "herramientas", "tecnologias_especificas"];
const DEADLINE_FIELDS: &[&str] = &["plazos", "cronograma", "fechas", "fecha_entrega", "plazos_criticos"];
const DELIVERABLE_FIELDS: &[&str] = &["entregables", "productos", "deliverables", "entregables_obligatorios"];
const SPECIAL_FIELDS: &[&str] = &["requisitos_especiales", "consideraciones", "restricciones"];

pub const NO_IMPROVEMENTS: &str = "No se identificaron áreas específicas que requieran mejoras.";

/// Criteria text handed to the criteria-extraction prompt.
const CRITERIA_SOURCE_CHARS: usize = 3000;
/// Cap on the raw answer kept as a summary.
const SUMMARY_CHARS: usize = 2000;

// ── Criteria ────────────────────────────────────────────────────────────

/// Requirement items a proposal is checked against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCriteria {
    pub technologies: Vec<String>,
    pub deadlines: Vec<String>,
    pub deliverables: Vec<String>,
    pub special: Vec<String>,
}

impl RequirementCriteria {
    /// Criteria from a JSON record, merging every alias of each category.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let collect = |names: &[&str]| -> Vec<String> {
            names
                .iter()
                .filter_map(|name| map.get(*name))
                .flat_map(split_items)
                .collect()
        };
        Self {
            technologies: collect(TECHNOLOGY_FIELDS),
            deadlines: collect(DEADLINE_FIELDS),
            deliverables: collect(DELIVERABLE_FIELDS),
            special: collect(SPECIAL_FIELDS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
            && self.deadlines.is_empty()
            && self.deliverables.is_empty()
            && self.special.is_empty()
    }

    pub fn to_prompt_text(&self) -> String {
        let block = |label: &str, items: &[String]| -> String {
            if items.is_empty() {
                format!("{label}: (ninguno)")
            } else {
                let list: Vec<String> = items.iter().map(|i| format!("  - {i}")).collect();
                format!("{label}:\n{}", list.join("\n"))
            }
        };
        [
            block("Tecnologías", &self.technologies),
            block("Plazos", &self.deadlines),
            block("Entregables", &self.deliverables),
            block("Requisitos especiales", &self.special),
        ]
        .join("\n")
    }
}

/// Items of one field: arrays element-wise, strings split on lines and
/// bullets, unspecified markers dropped.
fn split_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().flat_map(split_items).collect(),
        Value::String(s) => s
            .split(['\n', ';', '•'])
            .map(|item| {
                item.trim()
                    .trim_start_matches(['-', '*', '·'])
                    .trim()
                    .to_string()
            })
            .filter(|item| !is_unspecified(item))
            .collect(),
        Value::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

// ── Evaluation record ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: String,
    pub score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub requirement_compliance: BTreeMap<String, bool>,
}

impl Evaluation {
    /// Parse a backend answer. Text around the JSON object is ignored;
    /// English and Spanish keys are both accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let json = extract_json_object(raw)
            .ok_or_else(|| Error::MalformedOutput("evaluation answer holds no JSON object".into()))?;
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::MalformedOutput(format!("evaluation is not valid JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(Error::MalformedOutput("evaluation is not a JSON object".into()));
        };

        let status = match lookup(&map, &["status", "estado"]) {
            None => "desconocido".to_string(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(other) => return Err(malformed("status", other)),
        };

        let score = match lookup(&map, &["score", "puntuacion", "puntuación"]) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| Error::MalformedOutput("evaluation score is missing or not a number".into()))?;
        if !(0.0..=10.0).contains(&score) {
            return Err(Error::MalformedOutput(format!("evaluation score {score} is outside 0-10")));
        }

        let strengths = string_list(&map, &["strengths", "fortalezas"])?;
        let weaknesses = string_list(&map, &["weaknesses", "debilidades"])?;

        let mut requirement_compliance = BTreeMap::new();
        match lookup(&map, &["requirement_compliance", "cumplimiento_requisitos"]) {
            None => {}
            Some(Value::Object(entries)) => {
                for (name, met) in entries {
                    let Value::Bool(met) = met else {
                        return Err(Error::MalformedOutput(format!(
                            "compliance value for '{name}' is not a boolean"
                        )));
                    };
                    requirement_compliance.insert(name.clone(), *met);
                }
            }
            Some(other) => return Err(malformed("requirement_compliance", other)),
        }

        Ok(Self {
            status,
            score,
            strengths,
            weaknesses,
            requirement_compliance,
        })
    }

    /// `(met, total, percent)` of the compliance map.
    pub fn compliance(&self) -> (usize, usize, usize) {
        let total = self.requirement_compliance.len();
        let met = self.requirement_compliance.values().filter(|v| **v).count();
        let percent = if total == 0 { 0 } else { met * 100 / total };
        (met, total, percent)
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

fn string_list(map: &Map<String, Value>, keys: &[&str]) -> Result<Vec<String>> {
    match lookup(map, keys) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(malformed(keys[0], other)),
            })
            .collect(),
        Some(other) => Err(malformed(keys[0], other)),
    }
}

fn malformed(field: &str, value: &Value) -> Error {
    Error::MalformedOutput(format!("unexpected evaluation value for '{field}': {value}"))
}

/// Up to three recommendations derived from the top weaknesses.
pub fn recommendations(weaknesses: &[String]) -> Vec<String> {
    weaknesses.iter().take(3).map(|w| recommend(w)).collect()
}

fn recommend(weakness: &str) -> String {
    const REWRITES: [(&str, &str); 5] = [
        ("Falta de", "Incluir"),
        ("Ausencia de", "Incorporar"),
        ("No se", "Se recomienda"),
        ("Lack of", "Include"),
        ("Missing", "Add"),
    ];
    let weakness = weakness.trim();
    for (prefix, replacement) in REWRITES {
        let matched = weakness
            .get(..prefix.len())
            .filter(|head| head.eq_ignore_ascii_case(prefix));
        if matched.is_some() {
            return format!("{replacement}{}", &weakness[prefix.len()..]);
        }
    }
    weakness.to_string()
}

// ── Outcome ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Structured {
        evaluation: Evaluation,
        recommendations: Vec<String>,
    },
    /// The backend answer could not be used as a record
    Summary { text: String },
}

impl EvaluationOutcome {
    pub fn from_evaluation(evaluation: Evaluation) -> Self {
        let recommendations = recommendations(&evaluation.weaknesses);
        EvaluationOutcome::Structured {
            evaluation,
            recommendations,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            EvaluationOutcome::Structured { evaluation, .. } => Some(evaluation.score),
            EvaluationOutcome::Summary { .. } => None,
        }
    }

    /// Human-readable summary for the caller.
    pub fn status_message(&self) -> String {
        let (evaluation, recommendations) = match self {
            EvaluationOutcome::Structured {
                evaluation,
                recommendations,
            } => (evaluation, recommendations),
            EvaluationOutcome::Summary { text } => {
                return format!("Evaluación completada sin resultado estructurado.\n\n{text}");
            }
        };

        let (met, total, percent) = evaluation.compliance();
        let listed = |items: &[String], empty: &str| -> String {
            if items.is_empty() {
                format!("- {empty}")
            } else {
                items.iter().take(3).map(|i| format!("- {i}")).collect::<Vec<_>>().join("\n")
            }
        };

        format!(
            "Propuesta evaluada: estado '{status}' con puntuación {score}/10.\n\n\
             Resumen de evaluación:\n\
             - Cumplimiento: {percent}% ({met}/{total} requisitos)\n\n\
             Principales fortalezas:\n{strengths}\n\n\
             Áreas de mejora:\n{weaknesses}\n\n\
             Recomendaciones específicas:\n{recommendations}",
            status = evaluation.status,
            score = evaluation.score,
            strengths = listed(&evaluation.strengths, "No se identificaron fortalezas específicas."),
            weaknesses = listed(&evaluation.weaknesses, "No se identificaron debilidades específicas."),
            recommendations = if recommendations.is_empty() {
                NO_IMPROVEMENTS.to_string()
            } else {
                listed(recommendations, NO_IMPROVEMENTS)
            },
        )
    }
}

// ── Evaluator ───────────────────────────────────────────────────────────

pub struct Evaluator {
    generator: Generator,
    limits: PromptLimits,
}

impl Evaluator {
    pub fn new(generator: Generator, limits: PromptLimits) -> Self {
        Self { generator, limits }
    }

    /// Criteria from structured fields, or backend extraction for free
    /// text. Extraction failures yield empty criteria.
    pub async fn criteria(&self, requirement: &RequirementInfo) -> RequirementCriteria {
        let text = match requirement {
            RequirementInfo::Structured(map) => return RequirementCriteria::from_map(map),
            RequirementInfo::FreeText(text) => text,
        };

        let prompt = prompt::criteria_prompt(text, CRITERIA_SOURCE_CHARS);
        let answer = match self.generator.generate(&prompt).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "Criteria extraction failed, evaluating without criteria");
                return RequirementCriteria::default();
            }
        };
        let parsed = extract_json_object(&answer).and_then(|json| serde_json::from_str::<Value>(json).ok());
        match parsed {
            Some(Value::Object(map)) => RequirementCriteria::from_map(&map),
            _ => {
                warn!("Criteria answer was not a JSON object, evaluating without criteria");
                RequirementCriteria::default()
            }
        }
    }

    /// Score a proposal. Never fails: backend errors and malformed answers
    /// become a [`EvaluationOutcome::Summary`].
    pub async fn evaluate(&self, proposal: &str, requirement: &RequirementInfo) -> EvaluationOutcome {
        let criteria = self.criteria(requirement).await;
        let prompt = prompt::evaluation_prompt(proposal, requirement, &criteria.to_prompt_text(), &self.limits);

        let answer = match self.generator.generate(&prompt).await {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "Evaluation call failed");
                return EvaluationOutcome::Summary {
                    text: format!("La evaluación no pudo completarse: {e}"),
                };
            }
        };

        match Evaluation::parse(&answer) {
            Ok(evaluation) => {
                info!(
                    score = evaluation.score,
                    status = %evaluation.status,
                    weaknesses = evaluation.weaknesses.len(),
                    "Proposal evaluated"
                );
                EvaluationOutcome::from_evaluation(evaluation)
            }
            Err(e) => {
                warn!(error = %e, "Evaluation answer malformed, keeping it as a summary");
                EvaluationOutcome::Summary {
                    text: truncate_chars(&normalize(&answer), SUMMARY_CHARS).to_string(),
                }
            }
        }
    }
}
