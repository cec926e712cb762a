//! The section orchestrator.
//!
//! Walks the outline one section at a time, then combines, repairs, and
//! evaluates the proposal:
//!
//! ```text
//! GenerateSections ──(sections left)──▶ GenerateSections
//!        │ exhausted
//!        ▼
//! CombineProposal ──▶ EvaluateProposal ──▶ End
//! ```
//!
//! No single section can stop a run. A backend error or timeout for one
//! section yields a placeholder and the loop moves on; only missing inputs
//! or nothing to combine end the run early, with an error recorded in the
//! state.

use crate::assembler::ProposalAssembler;
use crate::backend::Generator;
use crate::evaluation::Evaluator;
use crate::metadata::ProjectMetadata;
use crate::prompt::{self, PromptLimits, SectionContext};
use crate::repair::RepairChain;
use crate::state::{GenerationState, Step, StepOutcome};
use draftwright_config::AppConfig;
use draftwright_core::{RequirementInfo, SectionSpec};
use draftwright_index::SectionRetriever;
use draftwright_validation::grammar::format_heading;
use draftwright_validation::normalize_section_body;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body of a section the backend could not produce.
pub const PLACEHOLDER_MARKER: &str =
    "[Esta sección no pudo generarse correctamente. Revise los registros para más detalles.]";

const DEFAULT_DOCUMENT_CODE: &str = "PKS-537 RQ-01";
const DEFAULT_TOP_K: usize = 3;

pub struct Orchestrator {
    generator: Generator,
    retriever: Option<Arc<SectionRetriever>>,
    assembler: ProposalAssembler,
    evaluator: Evaluator,
    repair_chain: RepairChain,
    limits: PromptLimits,
    top_k: usize,
}

impl Orchestrator {
    /// An orchestrator without retrieval, using default limits.
    pub fn new(generator: Generator) -> Self {
        let limits = PromptLimits::default();
        Self {
            evaluator: Evaluator::new(generator.clone(), limits),
            generator,
            retriever: None,
            assembler: ProposalAssembler::new(DEFAULT_DOCUMENT_CODE),
            repair_chain: RepairChain::deterministic(),
            limits,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn from_config(
        generator: Generator,
        retriever: Option<Arc<SectionRetriever>>,
        config: &AppConfig,
    ) -> Self {
        let limits = PromptLimits::from_config(config);
        Self {
            evaluator: Evaluator::new(generator.clone(), limits),
            repair_chain: RepairChain::from_config(&generator, &config.generation),
            generator,
            retriever,
            assembler: ProposalAssembler::new(config.generation.document_code.clone()),
            limits,
            top_k: config.retrieval.top_k,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<SectionRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_repair_chain(mut self, chain: RepairChain) -> Self {
        self.repair_chain = chain;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn assembler(&self) -> &ProposalAssembler {
        &self.assembler
    }

    /// Outline in, finished state out.
    pub async fn synthesize(
        &self,
        outline: Vec<SectionSpec>,
        requirement: Option<RequirementInfo>,
    ) -> GenerationState {
        let mut state = GenerationState::new(outline, requirement);
        self.run(&mut state).await;
        state
    }

    /// Step until [`Step::End`]. Bounded by `sections + 4` steps.
    pub async fn run(&self, state: &mut GenerationState) {
        let limit = state.outline.len() + 4;
        let mut steps = 0usize;

        while !state.is_complete() {
            if steps >= limit {
                warn!(limit, step = ?state.next_step, "Step limit reached, ending run");
                state.record_error(format!("Se alcanzó el límite de {limit} pasos"));
                state.next_step = Step::End;
                break;
            }
            self.step(state).await;
            steps += 1;
        }

        info!(
            steps,
            sections = state.sections().len(),
            errors = state.errors.len(),
            "Run finished"
        );
    }

    /// Execute one step and advance `state.next_step`. Returns the new step.
    pub async fn step(&self, state: &mut GenerationState) -> Step {
        let current = state.next_step;
        let outcome = match current {
            Step::GenerateSections => self.generate_section(state).await,
            Step::CombineProposal => self.combine(state).await,
            Step::EvaluateProposal => self.evaluate(state).await,
            Step::End => return Step::End,
        };
        state.next_step = current.next(outcome);
        debug!(from = ?current, ?outcome, to = ?state.next_step, "Step complete");
        state.next_step
    }

    // ── Steps ──

    async fn generate_section(&self, state: &mut GenerationState) -> StepOutcome {
        let requirement = match state.requirement_info.clone() {
            Some(r) if !r.is_empty() => r,
            _ => return input_missing(state, "información del documento de requisitos"),
        };
        if state.outline.is_empty() {
            return input_missing(state, "lista de secciones");
        }
        let Some(section) = state.current_section().cloned() else {
            info!(sections = state.sections().len(), "All sections generated");
            return StepOutcome::SectionsExhausted;
        };

        let number = state.current_section_index() + 1;
        let heading = format_heading(u32::try_from(number).unwrap_or(u32::MAX), &section.display_title());
        info!(section = %section.name, number, total = state.outline.len(), "Generating section");

        let retrieved = match &self.retriever {
            Some(retriever) => {
                retriever
                    .retrieve(&section.name, &requirement.as_prompt_text(), self.top_k)
                    .await
                    .results
            }
            None => Vec::new(),
        };

        let metadata = ProjectMetadata::extract(&requirement, None);
        let prompt = prompt::section_prompt(
            &SectionContext {
                section: &section,
                number,
                metadata: &metadata,
                requirement: &requirement,
                previous_sections: state.sections(),
                retrieved: &retrieved,
            },
            &self.limits,
        );

        let body = match self
            .generator
            .generate_with_system(prompt::SECTION_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(raw) => Some(normalize_section_body(&raw)).filter(|b| !b.is_empty()),
            Err(e) => {
                warn!(section = %section.name, error = %e, "Section generation failed, using placeholder");
                state.record_error(format!("Sección {}: {e}", section.name));
                None
            }
        };

        match body {
            Some(body) => {
                let chars = body.chars().count();
                state.record_section(&section.name, format!("{heading}\n\n{body}"), Some(body));
                state.log(format!("Sección {} generada: {chars} caracteres", section.name));
                debug!(section = %section.name, chars, precedents = retrieved.len(), "Section generated");
            }
            None => {
                state.record_section(&section.name, format!("{heading}\n\n{PLACEHOLDER_MARKER}"), None);
                state.log(format!("Sección {} sustituida por marcador", section.name));
            }
        }
        StepOutcome::SectionProcessed
    }

    async fn combine(&self, state: &mut GenerationState) -> StepOutcome {
        if state.sections().is_empty() {
            warn!("No sections to combine");
            state.record_error("No hay secciones generadas para combinar");
            state.status_message = Some("Error: no hay secciones generadas para combinar.".into());
            return StepOutcome::NothingToCombine;
        }

        let first = state.sections().first().map(String::as_str);
        let metadata = match &state.requirement_info {
            Some(requirement) => ProjectMetadata::extract(requirement, first),
            None => ProjectMetadata::default(),
        };
        let assembled = self.assembler.assemble(state.sections(), &metadata);
        let outcome = self.repair_chain.run(&assembled).await;

        if outcome.report.is_valid {
            info!(chars = outcome.document.chars().count(), "Proposal assembled");
        } else {
            let issues: Vec<String> = outcome.report.issues().collect();
            warn!(issues = issues.len(), "Proposal assembled with validation issues");
            state.log(format!("Propuesta con {} observaciones de validación", issues.len()));
        }

        state.set_proposal(outcome.document);
        state.validation = Some(outcome.report);
        state.repairs_applied = outcome.applied;
        state.log(format!("Propuesta ensamblada: {} - {}", metadata.title, metadata.client));
        StepOutcome::Combined
    }

    async fn evaluate(&self, state: &mut GenerationState) -> StepOutcome {
        let proposal = state.proposal().map(str::to_string);
        let requirement = state.requirement_info.clone();
        let (Some(proposal), Some(requirement)) = (proposal, requirement) else {
            return input_missing(state, "propuesta o documento de requisitos para evaluar");
        };

        let outcome = self.evaluator.evaluate(&proposal, &requirement).await;
        state.status_message = Some(outcome.status_message());
        state.evaluation = Some(outcome);
        StepOutcome::Evaluated
    }
}

fn input_missing(state: &mut GenerationState, what: &str) -> StepOutcome {
    warn!(missing = what, "Required input missing, ending run");
    let message = format!("Faltan datos necesarios: {what}");
    state.status_message = Some(format!("Error: {message}"));
    state.record_error(message);
    StepOutcome::InputMissing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationOutcome;
    use crate::test_helpers::{
        FailingProvider, FnProvider, SequentialMockProvider, SlowProvider, StaticProvider,
    };
    use draftwright_core::Passage;
    use draftwright_core::error::ProviderError;
    use draftwright_index::{HashingEmbedder, PassageIndex};
    use draftwright_validation::grammar::headings;
    use std::time::Duration;

    fn outline() -> Vec<SectionSpec> {
        SectionSpec::outline([("introduccion", "Contexto"), ("objetivos", "Metas")])
    }

    fn requirement() -> Option<RequirementInfo> {
        Some(RequirementInfo::FreeText("Sistema de telemetría para 40 estaciones.".into()))
    }

    fn orchestrator(provider: impl draftwright_core::Provider + 'static) -> Orchestrator {
        Orchestrator::new(Generator::new(Arc::new(provider), "m"))
    }

    #[tokio::test]
    async fn sections_follow_outline_order() {
        let state = orchestrator(StaticProvider::new("<think>plan</think>\n## Título repetido\nContenido."))
            .synthesize(outline(), requirement())
            .await;

        assert_eq!(state.next_step, Step::End);
        assert_eq!(state.sections().len(), 2);
        assert!(state.sections()[0].starts_with("## 1. INTRODUCCION\n\nContenido."));
        assert!(state.sections()[1].starts_with("## 2. OBJETIVOS"));
        assert_eq!(state.generated_content["introduccion"], "Contenido.");

        let proposal = state.proposal().unwrap();
        let numbers: Vec<u32> = headings(proposal).iter().map(|h| h.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(state.validation.is_some());
        assert!(state.evaluation.is_some());
        assert!(state.status_message.is_some());
    }

    #[tokio::test]
    async fn body_headings_stay_inside_their_section() {
        let state = orchestrator(StaticProvider::new("Texto.\n\n## 1. Detalle\nmás"))
            .synthesize(outline(), requirement())
            .await;

        assert_eq!(state.generated_content["introduccion"], "Texto.\n\n### Detalle\nmás");
        let proposal = state.proposal().unwrap();
        let numbers: Vec<u32> = headings(proposal).iter().map(|h| h.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(proposal.contains("## Tabla de Contenido\n\n1. INTRODUCCION\n2. OBJETIVOS\n"));
        assert!(proposal.contains("## 1. INTRODUCCION\n\nTexto.\n\n### 1.1 Detalle\nmás"));
        assert!(proposal.contains("## 2. OBJETIVOS\n\nTexto.\n\n### 2.1 Detalle\nmás"));
        assert!(state.validation.as_ref().unwrap().numbering.valid);
    }

    #[tokio::test]
    async fn failing_backend_still_terminates() {
        let state = orchestrator(FailingProvider::network())
            .synthesize(outline(), requirement())
            .await;

        assert_eq!(state.next_step, Step::End);
        assert_eq!(state.sections().len(), 2);
        assert!(state.sections().iter().all(|s| s.ends_with(PLACEHOLDER_MARKER)));
        assert!(state.generated_content.is_empty());
        assert_eq!(state.placeholders, vec!["introduccion", "objetivos"]);
        assert!(state.proposal().is_some());
        assert!(matches!(state.evaluation, Some(EvaluationOutcome::Summary { .. })));
        assert_eq!(state.errors.len(), 2);
    }

    #[tokio::test]
    async fn index_tracks_sections_after_every_step() {
        let provider = SequentialMockProvider::new(vec![
            Ok("uno".into()),
            Err(ProviderError::EmptyResponse),
            Ok("   ".into()),
        ]);
        let orchestrator = orchestrator(provider);
        let outline = SectionSpec::outline([("a", ""), ("b", ""), ("c", "")]);
        let mut state = GenerationState::new(outline, requirement());

        for expected in 1..=3 {
            assert_eq!(orchestrator.step(&mut state).await, Step::GenerateSections);
            assert_eq!(state.sections().len(), expected);
            assert_eq!(state.current_section_index(), state.sections().len());
        }
        assert_eq!(orchestrator.step(&mut state).await, Step::CombineProposal);
        assert_eq!(state.sections().len(), 3);
        // Blank answers count as failures
        assert!(state.sections()[2].ends_with(PLACEHOLDER_MARKER));
    }

    #[tokio::test]
    async fn missing_inputs_end_the_run() {
        let orch = orchestrator(StaticProvider::new("x"));

        let state = orch.synthesize(Vec::new(), requirement()).await;
        assert_eq!(state.next_step, Step::End);
        assert!(state.sections().is_empty());
        assert_eq!(state.errors.len(), 1);
        assert!(state.status_message.as_deref().unwrap().starts_with("Error:"));

        let state = orch.synthesize(outline(), None).await;
        assert_eq!(state.next_step, Step::End);
        assert!(state.proposal().is_none());

        let state = orch
            .synthesize(outline(), Some(RequirementInfo::FreeText("  ".into())))
            .await;
        assert_eq!(state.next_step, Step::End);
    }

    #[tokio::test]
    async fn combine_uses_requirement_metadata() {
        let orch = orchestrator(StaticProvider::new("{}"));
        let requirement = RequirementInfo::parse(r#"{"titulo_proyecto": "X", "cliente": "Y"}"#);
        let mut state = GenerationState::new(SectionSpec::outline([("intro", "")]), Some(requirement));
        state.record_section("intro", "## 1. INTRO\nbody".into(), Some("body".into()));
        state.next_step = Step::CombineProposal;

        assert_eq!(orch.step(&mut state).await, Step::EvaluateProposal);
        let doc = state.proposal().unwrap();
        assert!(doc.contains("**Proyecto: X**"));
        assert!(doc.contains("**Cliente: Y**"));
        assert!(doc.lines().any(|l| l == "1. INTRO"));
    }

    #[tokio::test]
    async fn nothing_to_combine_ends_the_run() {
        let orch = orchestrator(StaticProvider::new("x"));
        let mut state = GenerationState::new(outline(), requirement());
        state.next_step = Step::CombineProposal;
        assert_eq!(orch.step(&mut state).await, Step::End);
        assert_eq!(state.errors.len(), 1);
    }

    #[tokio::test]
    async fn prompts_see_previous_sections_and_precedent() {
        let index = Arc::new(PassageIndex::new(Arc::new(HashingEmbedder::new(256)), 8));
        index
            .add(vec![
                Passage::new("PKS-101 Puente", 0, "Objetivos del proyecto: reducir pérdidas en 30%.")
                    .with_tag("project_name", "PKS-101 Puente")
                    .with_tag("project_code", "PKS-101"),
            ])
            .await
            .unwrap();
        let retriever = Arc::new(SectionRetriever::new(index, 3, 500));

        let provider = Arc::new(FnProvider::by_prompt(|prompt| {
            if prompt.contains("número 1") {
                Ok("Primera sección única.".into())
            } else {
                Ok("Otra sección.".into())
            }
        }));
        let orch = Orchestrator::new(Generator::new(provider.clone(), "m")).with_retriever(retriever);
        let state = orch.synthesize(outline(), requirement()).await;
        assert_eq!(state.next_step, Step::End);

        let prompts = provider.prompts();
        assert!(!prompts[0].contains("CONTENIDO PREVIO"));
        assert!(prompts[1].contains("Primera sección única."));
        assert!(prompts[1].contains("### Ejemplo 1 - Proyecto: PKS-101 Puente (Código: PKS-101)"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_placeholder() {
        let generator = Generator::new(Arc::new(SlowProvider::new(Duration::from_secs(60))), "m")
            .with_timeout(Duration::from_secs(5));
        let state = Orchestrator::new(generator)
            .synthesize(SectionSpec::outline([("alcance", "")]), requirement())
            .await;
        assert_eq!(state.next_step, Step::End);
        assert!(state.sections()[0].starts_with("## 1. ALCANCE"));
        assert!(state.sections()[0].ends_with(PLACEHOLDER_MARKER));
    }
}
