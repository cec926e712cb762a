//! Section identity catalog.
//!
//! A section identity is the structural category of a proposal section
//! (introduction, objectives, scope, ...) independent of its exact heading
//! wording. This module is the one table every other layer reads:
//!
//! - **retrieval** filters precedent passages with [`SectionIdentity::retrieval_variants`]
//! - **prompting** embeds [`SectionIdentity::guidance`] as a per-section checklist
//! - **validation** matches numbered headings with [`SectionIdentity::detect`]
//! - **outline repair** fills gaps with [`SectionIdentity::default_description`]
//!
//! Matching works on folded text (lowercase, Spanish diacritics removed), so
//! `METODOLOGÍA`, `Metodologia` and `metodología` all detect the same identity.

use serde::{Deserialize, Serialize};

/// The canonical structural categories of a technical proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionIdentity {
    Introduction,
    Objectives,
    Scope,
    Methodology,
    WorkPlan,
    Deliverables,
    Resources,
    Risks,
    Quality,
    Standards,
    Experience,
    Annexes,
}

impl SectionIdentity {
    /// All identities in canonical proposal order. Detection checks them in
    /// this order, so the first identity whose keywords match wins.
    pub const ALL: [SectionIdentity; 12] = [
        SectionIdentity::Introduction,
        SectionIdentity::Objectives,
        SectionIdentity::Scope,
        SectionIdentity::Methodology,
        SectionIdentity::WorkPlan,
        SectionIdentity::Deliverables,
        SectionIdentity::Resources,
        SectionIdentity::Risks,
        SectionIdentity::Quality,
        SectionIdentity::Standards,
        SectionIdentity::Experience,
        SectionIdentity::Annexes,
    ];

    /// Identities every complete proposal must contain.
    pub fn required() -> impl Iterator<Item = SectionIdentity> {
        Self::ALL.into_iter().filter(|id| id.is_required())
    }

    pub fn is_required(self) -> bool {
        !matches!(self, SectionIdentity::Annexes)
    }

    /// Outline key used when the identity has to be synthesized
    /// (`PLAN_DE_TRABAJO`).
    pub fn outline_key(self) -> &'static str {
        match self {
            SectionIdentity::Introduction => "INTRODUCCION",
            SectionIdentity::Objectives => "OBJETIVOS",
            SectionIdentity::Scope => "ALCANCE",
            SectionIdentity::Methodology => "METODOLOGIA",
            SectionIdentity::WorkPlan => "PLAN_DE_TRABAJO",
            SectionIdentity::Deliverables => "ENTREGABLES",
            SectionIdentity::Resources => "RECURSOS",
            SectionIdentity::Risks => "RIESGOS",
            SectionIdentity::Quality => "CALIDAD",
            SectionIdentity::Standards => "NORMATIVAS",
            SectionIdentity::Experience => "EXPERIENCIA",
            SectionIdentity::Annexes => "ANEXOS",
        }
    }

    /// Heading title used in validation suggestions.
    pub fn title(self) -> &'static str {
        match self {
            SectionIdentity::Introduction => "INTRODUCCIÓN",
            SectionIdentity::Objectives => "OBJETIVOS",
            SectionIdentity::Scope => "ALCANCE",
            SectionIdentity::Methodology => "METODOLOGÍA",
            SectionIdentity::WorkPlan => "PLAN DE TRABAJO",
            SectionIdentity::Deliverables => "ENTREGABLES",
            SectionIdentity::Resources => "RECURSOS",
            SectionIdentity::Risks => "GESTIÓN DE RIESGOS",
            SectionIdentity::Quality => "PLAN DE CALIDAD",
            SectionIdentity::Standards => "NORMATIVAS Y ESTÁNDARES",
            SectionIdentity::Experience => "EXPERIENCIA",
            SectionIdentity::Annexes => "ANEXOS",
        }
    }

    /// Folded keywords; a heading or outline key containing any of them
    /// belongs to this identity.
    fn keywords(self) -> &'static [&'static str] {
        match self {
            SectionIdentity::Introduction => &["introduccion", "introduction", "antecedentes"],
            SectionIdentity::Objectives => &["objetivo", "objective"],
            SectionIdentity::Scope => &["alcance", "scope"],
            SectionIdentity::Methodology => &["metodolog", "methodology", "enfoque tecnico"],
            SectionIdentity::WorkPlan => &[
                "plan de trabajo",
                "cronograma",
                "planificacion",
                "work plan",
                "schedule",
                "timeline",
            ],
            SectionIdentity::Deliverables => &["entregable", "deliverable", "productos"],
            SectionIdentity::Resources => &[
                "recurso",
                "personal",
                "equipo de trabajo",
                "equipo del proyecto",
                "resources",
                "staffing",
            ],
            SectionIdentity::Risks => &["riesgo", "risk"],
            SectionIdentity::Quality => &["calidad", "quality"],
            SectionIdentity::Standards => &[
                "normativ",
                "estandar",
                "regulacion",
                "marco legal",
                "standards",
                "compliance",
            ],
            SectionIdentity::Experience => &[
                "experiencia",
                "proyectos similares",
                "referencias",
                "experience",
                "track record",
            ],
            SectionIdentity::Annexes => &["anexo", "apendice", "annex", "appendix"],
        }
    }

    /// Detect the identity of a heading title or outline key.
    ///
    /// Underscores and hyphens count as spaces and leading ordinals are
    /// ignored, so `3. ALCANCE`, `ALCANCE_DEL_TRABAJO` and `alcance` all
    /// detect [`SectionIdentity::Scope`].
    pub fn detect(name: &str) -> Option<SectionIdentity> {
        let folded = fold(&name.replace(['_', '-'], " "));
        let folded = strip_ordinal(&folded);
        if folded.is_empty() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|id| id.keywords().iter().any(|kw| folded.contains(kw)))
    }

    /// Whether a heading or key mentions this identity at all. Unlike
    /// [`SectionIdentity::detect`], a combined title such as
    /// `RECURSOS Y EXPERIENCIA` matches both identities it names.
    pub fn matches(self, name: &str) -> bool {
        let folded = fold(&name.replace(['_', '-'], " "));
        self.keywords().iter().any(|kw| folded.contains(kw))
    }

    /// Case-insensitive substrings that mark a passage as belonging to this
    /// identity: spellings with and without diacritics, ordinal labels, and
    /// English variants.
    pub fn retrieval_variants(self) -> &'static [&'static str] {
        match self {
            SectionIdentity::Introduction => &[
                "introducción",
                "introduccion",
                "1. introducción",
                "i. introducción",
                "antecedentes",
                "introduction",
            ],
            SectionIdentity::Objectives => &[
                "objetivos",
                "objetivo general",
                "objetivos específicos",
                "objetivos especificos",
                "2. objetivos",
                "ii. objetivos",
                "objectives",
            ],
            SectionIdentity::Scope => &[
                "alcance",
                "alcance del trabajo",
                "alcance del proyecto",
                "3. alcance",
                "iii. alcance",
                "scope",
            ],
            SectionIdentity::Methodology => &[
                "metodología",
                "metodologia",
                "enfoque metodológico",
                "4. metodología",
                "iv. metodología",
                "methodology",
            ],
            SectionIdentity::WorkPlan => &[
                "plan de trabajo",
                "cronograma",
                "planificación",
                "planificacion",
                "5. plan de trabajo",
                "work plan",
                "schedule",
            ],
            SectionIdentity::Deliverables => &[
                "entregables",
                "productos entregables",
                "6. entregables",
                "vi. entregables",
                "deliverables",
            ],
            SectionIdentity::Resources => &[
                "recursos",
                "recursos humanos",
                "personal",
                "equipo de trabajo",
                "7. recursos",
                "resources",
                "staff",
            ],
            SectionIdentity::Risks => &[
                "riesgos",
                "gestión de riesgos",
                "gestion de riesgos",
                "matriz de riesgos",
                "8. riesgos",
                "risks",
                "risk management",
            ],
            SectionIdentity::Quality => &[
                "calidad",
                "plan de calidad",
                "aseguramiento de la calidad",
                "9. calidad",
                "quality",
                "quality assurance",
            ],
            SectionIdentity::Standards => &[
                "normativas",
                "normativa",
                "estándares",
                "estandares",
                "normas aplicables",
                "10. normativas",
                "standards",
            ],
            SectionIdentity::Experience => &[
                "experiencia",
                "proyectos similares",
                "experiencia relevante",
                "11. experiencia",
                "experience",
                "track record",
            ],
            SectionIdentity::Annexes => &[
                "anexos",
                "anexo",
                "apéndice",
                "apendice",
                "12. anexos",
                "annexes",
                "appendix",
            ],
        }
    }

    /// What must be concrete in a section of this identity.
    pub fn guidance(self) -> &'static [&'static str] {
        match self {
            SectionIdentity::Introduction => &[
                "Contexto específico del cliente y del problema que motiva el proyecto",
                "Antecedentes relevantes del requerimiento, con cifras cuando existan",
                "Propósito de la propuesta en una o dos frases verificables",
                "Estructura del documento y cómo se relaciona con el requerimiento",
            ],
            SectionIdentity::Objectives => &[
                "Un objetivo general medible y alineado con el requerimiento",
                "Entre tres y cinco objetivos específicos con indicadores cuantificables",
                "Criterios de éxito con metas numéricas y plazos",
                "Relación explícita entre cada objetivo y un entregable",
            ],
            SectionIdentity::Scope => &[
                "Actividades incluidas, enumeradas y delimitadas",
                "Exclusiones explícitas para evitar ambigüedad contractual",
                "Supuestos y dependencias del cliente",
                "Límites geográficos, técnicos y temporales del trabajo",
            ],
            SectionIdentity::Methodology => &[
                "Fases con nombre, duración y actividades concretas",
                "Herramientas y tecnologías nombradas con su versión o proveedor",
                "Técnicas de control y seguimiento con métricas",
                "Mecanismos de coordinación con el cliente y frecuencia de reuniones",
            ],
            SectionIdentity::WorkPlan => &[
                "Cronograma en tabla markdown con actividades, semanas y responsables",
                "Hitos principales con fechas o semanas de cumplimiento",
                "Dependencias críticas entre actividades",
                "Duración total y holguras previstas",
            ],
            SectionIdentity::Deliverables => &[
                "Tabla de entregables con nombre, formato y fecha de entrega",
                "Criterios de aceptación de cada entregable",
                "Responsable de elaboración y de aprobación",
                "Relación de cada entregable con una fase de la metodología",
            ],
            SectionIdentity::Resources => &[
                "Roles con perfil profesional, años de experiencia y dedicación",
                "Organigrama o tabla del equipo con responsabilidades",
                "Equipamiento, software y licencias necesarios",
                "Recursos que aportará el cliente",
            ],
            SectionIdentity::Risks => &[
                "Matriz de riesgos en tabla con probabilidad e impacto",
                "Medidas de mitigación concretas para cada riesgo",
                "Plan de contingencia para los riesgos de mayor impacto",
                "Responsable del seguimiento de cada riesgo",
            ],
            SectionIdentity::Quality => &[
                "Estándares de calidad aplicables nombrados explícitamente",
                "Indicadores de calidad con umbrales numéricos",
                "Procedimientos de revisión, control y aprobación",
                "Gestión de no conformidades y mejora continua",
            ],
            SectionIdentity::Standards => &[
                "Normas y leyes aplicables citadas con su código",
                "Forma en que cada norma se cumple durante el proyecto",
                "Certificaciones del equipo o de la organización",
                "Requisitos regulatorios propios del cliente",
            ],
            SectionIdentity::Experience => &[
                "Proyectos similares con cliente, año, alcance y resultados",
                "Cifras de resultados obtenidos en esos proyectos",
                "Lecciones aprendidas aplicables a esta propuesta",
                "Referencias verificables",
            ],
            SectionIdentity::Annexes => &[
                "Lista numerada de anexos con su contenido",
                "Documentación técnica de soporte",
                "Certificados, hojas de vida o planos cuando correspondan",
                "Referencias cruzadas a las secciones que los citan",
            ],
        }
    }

    /// Static outline description, used when the outline has to be repaired.
    pub fn default_description(self) -> &'static str {
        match self {
            SectionIdentity::Introduction => "Contexto del proyecto, antecedentes y propósito de la propuesta",
            SectionIdentity::Objectives => "Objetivo general y objetivos específicos medibles",
            SectionIdentity::Scope => "Actividades incluidas, exclusiones y supuestos del trabajo",
            SectionIdentity::Methodology => "Enfoque, fases, herramientas y técnicas de trabajo",
            SectionIdentity::WorkPlan => "Cronograma de actividades, hitos y dependencias",
            SectionIdentity::Deliverables => "Productos a entregar con formato, fecha y criterios de aceptación",
            SectionIdentity::Resources => "Equipo de trabajo, roles, dedicación y recursos técnicos",
            SectionIdentity::Risks => "Identificación, evaluación y mitigación de riesgos",
            SectionIdentity::Quality => "Aseguramiento y control de la calidad del servicio",
            SectionIdentity::Standards => "Normativas, estándares y regulaciones aplicables",
            SectionIdentity::Experience => "Proyectos similares ejecutados y resultados obtenidos",
            SectionIdentity::Annexes => "Documentación técnica complementaria",
        }
    }
}

/// Fallback retrieval variant for a section name with no known identity:
/// lowercase, underscores as spaces, leading ordinals and punctuation removed.
pub fn fallback_variant(name: &str) -> String {
    let lowered = name.replace('_', " ").to_lowercase();
    strip_ordinal(&lowered).to_string()
}

/// Lowercase and remove Spanish diacritics.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn strip_ordinal(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_ascii_digit() || c.is_whitespace() || ".-:)".contains(c))
        .trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_handles_accents_and_case() {
        assert_eq!(SectionIdentity::detect("METODOLOGÍA"), Some(SectionIdentity::Methodology));
        assert_eq!(SectionIdentity::detect("metodologia"), Some(SectionIdentity::Methodology));
        assert_eq!(SectionIdentity::detect("Introducción"), Some(SectionIdentity::Introduction));
    }

    #[test]
    fn detect_handles_outline_keys_and_ordinals() {
        assert_eq!(
            SectionIdentity::detect("PLAN_DE_TRABAJO_Y_CRONOGRAMA"),
            Some(SectionIdentity::WorkPlan)
        );
        assert_eq!(SectionIdentity::detect("3. ALCANCE"), Some(SectionIdentity::Scope));
        assert_eq!(
            SectionIdentity::detect("RECURSOS_HUMANOS_Y_TECNICOS"),
            Some(SectionIdentity::Resources)
        );
    }

    #[test]
    fn matches_every_named_identity() {
        assert!(SectionIdentity::Resources.matches("7. RECURSOS Y EXPERIENCIA"));
        assert!(SectionIdentity::Experience.matches("7. RECURSOS Y EXPERIENCIA"));
        assert!(!SectionIdentity::Risks.matches("7. RECURSOS Y EXPERIENCIA"));
    }

    #[test]
    fn quality_plan_is_not_a_work_plan() {
        assert_eq!(SectionIdentity::detect("PLAN DE CALIDAD"), Some(SectionIdentity::Quality));
        assert_eq!(SectionIdentity::detect("GESTIÓN DE RIESGOS"), Some(SectionIdentity::Risks));
    }

    #[test]
    fn detect_unknown_returns_none() {
        assert_eq!(SectionIdentity::detect("presupuesto"), None);
        assert_eq!(SectionIdentity::detect("12."), None);
    }

    #[test]
    fn annexes_are_optional() {
        let required: Vec<_> = SectionIdentity::required().collect();
        assert_eq!(required.len(), 11);
        assert!(!required.contains(&SectionIdentity::Annexes));
    }

    #[test]
    fn every_identity_has_guidance_and_variants() {
        for id in SectionIdentity::ALL {
            assert_eq!(id.guidance().len(), 4, "{id:?}");
            assert!(!id.retrieval_variants().is_empty());
            assert_eq!(SectionIdentity::detect(id.outline_key()), Some(id));
            assert_eq!(SectionIdentity::detect(id.title()), Some(id));
        }
    }

    #[test]
    fn fallback_variant_strips_ordinals() {
        assert_eq!(fallback_variant("4.- Presupuesto_Estimado"), "presupuesto estimado");
        assert_eq!(fallback_variant("Glosario"), "glosario");
    }

    #[test]
    fn fold_removes_diacritics() {
        assert_eq!(fold("GESTIÓN Ñandú"), "gestion nandu");
    }
}
