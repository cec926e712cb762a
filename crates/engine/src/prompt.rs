//! Prompt and context assembly.
//!
//! Every excerpt embedded in a prompt is capped here; the backend has no
//! stated input limit, so the caller truncates.

use crate::metadata::ProjectMetadata;
use draftwright_config::AppConfig;
use draftwright_core::identity::SectionIdentity;
use draftwright_core::passage::RetrievalResult;
use draftwright_core::requirement::truncate_chars;
use draftwright_core::{RequirementInfo, SectionSpec};
use std::fmt::Write;

pub const CONTEXT_TRUNCATED: &str = "[Contexto truncado por tamaño]";

/// Standing instructions for every section call.
pub const SECTION_SYSTEM_PROMPT: &str = "\
Eres un redactor técnico que elabora propuestas técnicas profesionales en español.
Reglas obligatorias:
1. Devuelve SOLO el contenido de la sección, sin repetir su encabezado.
2. Usa lenguaje técnico y profesional en español.
3. NO uses etiquetas <think> ni muestres tu razonamiento.
4. NO incluyas caracteres de otros alfabetos (chino, japonés, cirílico).
5. Sé específico: nombra tecnologías, cifras, métricas y roles concretos.
6. Usa viñetas con `- ` y tablas markdown cuando aporten claridad.
EVITA frases genéricas como 'se implementará una metodología adecuada' o \
'se seguirán las mejores prácticas' y cualquier contenido aplicable a cualquier proyecto.";

/// Character caps for prompt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub requirement_excerpt_chars: usize,
    pub previous_sections: usize,
    pub previous_section_chars: usize,
    pub previous_context_chars: usize,
    pub retrieval_context_chars: usize,
    pub evaluation_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            requirement_excerpt_chars: 1000,
            previous_sections: 2,
            previous_section_chars: 500,
            previous_context_chars: 3000,
            retrieval_context_chars: 7000,
            evaluation_chars: 12000,
        }
    }
}

impl PromptLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            requirement_excerpt_chars: config.generation.requirement_excerpt_chars,
            previous_sections: config.generation.previous_sections,
            previous_section_chars: config.generation.previous_section_chars,
            previous_context_chars: config.generation.previous_context_chars,
            retrieval_context_chars: config.retrieval.context_chars,
            evaluation_chars: config.generation.evaluation_chars,
        }
    }
}

/// Everything one section prompt is built from.
pub struct SectionContext<'a> {
    pub section: &'a SectionSpec,
    pub number: usize,
    pub metadata: &'a ProjectMetadata,
    pub requirement: &'a RequirementInfo,
    pub previous_sections: &'a [String],
    pub retrieved: &'a [RetrievalResult],
}

pub fn section_prompt(ctx: &SectionContext<'_>, limits: &PromptLimits) -> String {
    let title = ctx.section.display_title();
    let identity = SectionIdentity::detect(&ctx.section.name);
    let description = if ctx.section.description.trim().is_empty() {
        identity.map_or("", |i| i.default_description())
    } else {
        ctx.section.description.trim()
    };

    let mut prompt = format!(
        "Genera la sección \"{title}\" (número {number}) de una propuesta técnica.\n\n\
         INFORMACIÓN DEL PROYECTO:\n\
         - Título del proyecto: {project}\n\
         - Cliente: {client}\n\n\
         DESCRIPCIÓN DE LA SECCIÓN:\n{description}\n\n\
         INFORMACIÓN DEL DOCUMENTO DE REQUISITOS:\n{excerpt}\n\n",
        number = ctx.number,
        project = ctx.metadata.title,
        client = ctx.metadata.client,
        excerpt = ctx.requirement.excerpt(limits.requirement_excerpt_chars),
    );

    let previous = previous_context(ctx.previous_sections, limits);
    if !previous.is_empty() {
        prompt.push_str("CONTENIDO PREVIO DE LA PROPUESTA:\n");
        prompt.push_str(&previous);
        prompt.push_str("\n\nMantén coherencia con el contenido anterior y no repitas información.\n\n");
    }

    let examples = retrieval_context(ctx.retrieved, limits.retrieval_context_chars);
    if !examples.is_empty() {
        prompt.push_str("EJEMPLOS DE PROPUESTAS SIMILARES (referencia):\n");
        prompt.push_str(&examples);
        prompt.push_str("\n\n");
    }

    if let Some(identity) = identity {
        prompt.push_str("GUÍA ESPECÍFICA PARA ESTA SECCIÓN:\n");
        for item in identity.guidance() {
            let _ = writeln!(prompt, "- {item}");
        }
        prompt.push('\n');
    }

    prompt.push_str("Responde con el texto completo de la sección.");
    prompt
}

/// The last `previous_sections` sections, each excerpted, joined, and capped.
pub fn previous_context(sections: &[String], limits: &PromptLimits) -> String {
    let start = sections.len().saturating_sub(limits.previous_sections);
    let joined = sections[start..]
        .iter()
        .map(|s| truncate_chars(s.trim(), limits.previous_section_chars))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&joined, limits.previous_context_chars).to_string()
}

/// Precedent passages as numbered example blocks, capped at `max_chars`.
///
/// Blocks are added whole while they fit; the first one that does not is
/// cut and followed by the truncation marker.
pub fn retrieval_context(results: &[RetrievalResult], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for (i, result) in results.iter().enumerate() {
        let block = format!(
            "### Ejemplo {} - Proyecto: {} (Código: {})\n{}\n\n",
            i + 1,
            or_unknown(&result.project_name, "Desconocido"),
            or_unknown(&result.project_code, "N/A"),
            result.passage_text.trim()
        );
        let len = block.chars().count();

        if used + len > max_chars {
            let room = max_chars.saturating_sub(used);
            out.push_str(truncate_chars(&block, room));
            out.push_str("\n\n");
            out.push_str(CONTEXT_TRUNCATED);
            return out;
        }
        out.push_str(&block);
        used += len;
    }
    out.trim_end().to_string()
}

fn or_unknown<'a>(value: &'a str, unknown: &'a str) -> &'a str {
    if value.trim().is_empty() {
        unknown
    } else {
        value
    }
}

/// Ask for a structured record from free-text requirements.
pub fn analysis_prompt(text: &str, max_chars: usize) -> String {
    format!(
        "Extrae la siguiente información del documento de requisitos:\n\
         - titulo_proyecto\n- cliente\n- alcance\n- entregables\n\
         - tecnologias\n- plazos\n- requisitos_tecnicos\n- criterios_evaluacion\n\n\
         Responde ÚNICAMENTE con un objeto JSON con esas claves, sin etiquetas <think> \
         ni texto adicional. Usa \"No especificado\" cuando falte un dato.\n\n\
         DOCUMENTO:\n{}",
        truncate_chars(text.trim(), max_chars)
    )
}

/// Ask for a `{KEY: description}` outline covering the required sections.
pub fn outline_prompt(requirement: &RequirementInfo, max_chars: usize) -> String {
    let mut required = String::new();
    for (i, identity) in SectionIdentity::required().enumerate() {
        let _ = writeln!(
            required,
            "{}. {}: {}",
            i + 1,
            identity.title(),
            identity.default_description()
        );
    }
    format!(
        "Genera el índice de una propuesta técnica para el proyecto descrito. Cada sección es \
         una clave del JSON y su valor una descripción ESPECÍFICA del contenido, referida a \
         elementos concretos del documento de requisitos.\n\n\
         Secciones obligatorias:\n{required}\n\
         Devuelve ÚNICAMENTE un objeto JSON válido, sin etiquetas <think> ni comentarios.\n\
         Ejemplo: {{\"INTRODUCCION_Y_CONTEXTO\": \"...\", \"OBJETIVOS_GENERALES\": \"...\"}}\n\n\
         REQUISITOS:\n{}",
        requirement.excerpt(max_chars)
    )
}

/// Ask for the four evaluation criteria lists from free text.
pub fn criteria_prompt(text: &str, max_chars: usize) -> String {
    format!(
        "Analiza el siguiente documento de requisitos y extrae:\n\
         1. tecnologias: tecnologías específicas mencionadas\n\
         2. plazos: plazos críticos o fechas importantes\n\
         3. entregables: entregables obligatorios\n\
         4. requisitos_especiales: requisitos especiales o consideraciones particulares\n\n\
         Responde ÚNICAMENTE con un objeto JSON con esas cuatro claves y listas de cadenas \
         como valores. Usa una lista vacía cuando no encuentres información.\n\n\
         DOCUMENTO:\n{}",
        truncate_chars(text.trim(), max_chars)
    )
}

pub fn evaluation_prompt(
    proposal: &str,
    requirement: &RequirementInfo,
    criteria: &str,
    limits: &PromptLimits,
) -> String {
    format!(
        "Evalúa la siguiente propuesta técnica frente a su documento de requisitos.\n\n\
         CRITERIOS ESPECÍFICOS:\n{criteria}\n\n\
         REQUISITOS:\n{requirement}\n\n\
         PROPUESTA:\n{proposal}\n\n\
         Responde ÚNICAMENTE con un objeto JSON con las claves:\n\
         \"status\" (\"aprobada\" o \"requiere_mejoras\"), \"puntuacion\" (número de 0 a 10), \
         \"fortalezas\" (lista), \"debilidades\" (lista) y \"cumplimiento_requisitos\" \
         (objeto de requisito a booleano).",
        requirement = requirement.excerpt(limits.requirement_excerpt_chars),
        proposal = truncate_chars(proposal, limits.evaluation_chars),
    )
}

/// Ask the backend to fix a document the deterministic repair left invalid.
pub fn structure_repair_prompt(document: &str, issues: &[String]) -> String {
    let mut listed = String::new();
    for issue in issues {
        let _ = writeln!(listed, "- {issue}");
    }
    format!(
        "Corrige la estructura de la siguiente propuesta técnica. Problemas detectados:\n{listed}\n\
         Mantén el contenido, usa encabezados `## N. TÍTULO` numerados consecutivamente desde 1 \
         y subsecciones `### N.M Título`. Devuelve SOLO el documento corregido, sin etiquetas \
         <think> ni comentarios.\n\nDOCUMENTO:\n{document}"
    )
}
