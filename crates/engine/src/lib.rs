//! Proposal synthesis engine for draftwright.
//!
//! The [`Orchestrator`] drives one run over a [`GenerationState`]: it
//! generates each outline section through the [`Generator`] with retrieved
//! precedent, assembles the proposal ([`ProposalAssembler`]), validates and
//! repairs it ([`RepairChain`]), and scores it ([`Evaluator`]). The
//! [`planning`] module produces the run's inputs from a raw requirement.

pub mod assembler;
pub mod backend;
pub mod evaluation;
pub mod metadata;
pub mod orchestrator;
pub mod planning;
pub mod prompt;
pub mod repair;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::ProposalAssembler;
pub use backend::Generator;
pub use evaluation::{Evaluation, EvaluationOutcome, Evaluator, RequirementCriteria};
pub use metadata::ProjectMetadata;
pub use orchestrator::{Orchestrator, PLACEHOLDER_MARKER};
pub use planning::{analyze_requirement, plan_outline};
pub use prompt::PromptLimits;
pub use repair::{BackendRepair, DeterministicRepair, RepairChain, RepairOutcome, RepairStrategy};
pub use state::{GenerationState, Step, StepOutcome};
