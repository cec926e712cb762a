//! Run state for one synthesis run.
//!
//! A [`GenerationState`] is owned by the task executing the run and passed
//! by `&mut` through every orchestrator step. The section list is private:
//! [`GenerationState::record_section`] is the only way to append, and the
//! current section index is derived from its length, so the two can never
//! disagree.

use crate::evaluation::EvaluationOutcome;
use draftwright_core::{RequirementInfo, SectionSpec};
use draftwright_validation::ValidationReport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    GenerateSections,
    CombineProposal,
    EvaluateProposal,
    End,
}

/// What a step did; fed to [`Step::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    SectionProcessed,
    SectionsExhausted,
    Combined,
    NothingToCombine,
    Evaluated,
    InputMissing,
}

impl Step {
    /// Transition function. Any pairing not listed ends the run.
    pub fn next(self, outcome: StepOutcome) -> Step {
        match (self, outcome) {
            (_, StepOutcome::InputMissing) => Step::End,
            (Step::GenerateSections, StepOutcome::SectionProcessed) => Step::GenerateSections,
            (Step::GenerateSections, StepOutcome::SectionsExhausted) => Step::CombineProposal,
            (Step::CombineProposal, StepOutcome::Combined) => Step::EvaluateProposal,
            (Step::CombineProposal, StepOutcome::NothingToCombine) => Step::End,
            (Step::EvaluateProposal, StepOutcome::Evaluated) => Step::End,
            (Step::GenerateSections, _)
            | (Step::CombineProposal, _)
            | (Step::EvaluateProposal, _)
            | (Step::End, _) => Step::End,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Step::End
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationState {
    pub outline: Vec<SectionSpec>,
    pub requirement_info: Option<RequirementInfo>,
    sections: Vec<String>,
    /// Header-stripped body per section name; absent for placeholders
    pub generated_content: BTreeMap<String, String>,
    /// Names of the sections replaced by a placeholder, in outline order
    pub placeholders: Vec<String>,
    proposal: Option<String>,
    pub validation: Option<ValidationReport>,
    /// Names of the repair strategies that ran on the proposal
    pub repairs_applied: Vec<String>,
    pub evaluation: Option<EvaluationOutcome>,
    pub next_step: Step,
    pub errors: Vec<String>,
    /// Progress log, one line per notable event
    pub messages: Vec<String>,
    pub status_message: Option<String>,
}

impl GenerationState {
    pub fn new(outline: Vec<SectionSpec>, requirement_info: Option<RequirementInfo>) -> Self {
        Self {
            outline,
            requirement_info,
            sections: Vec::new(),
            generated_content: BTreeMap::new(),
            placeholders: Vec::new(),
            proposal: None,
            validation: None,
            repairs_applied: Vec::new(),
            evaluation: None,
            next_step: Step::GenerateSections,
            errors: Vec::new(),
            messages: Vec::new(),
            status_message: None,
        }
    }

    /// Generated sections with headings, in outline order.
    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Index of the next section to generate.
    pub fn current_section_index(&self) -> usize {
        self.sections.len()
    }

    /// The outline entry the next generate step works on, if any remain.
    pub fn current_section(&self) -> Option<&SectionSpec> {
        self.outline.get(self.current_section_index())
    }

    pub fn is_complete(&self) -> bool {
        self.next_step.is_terminal()
    }

    /// Append a generated section. `body` is `None` for placeholders.
    pub fn record_section(&mut self, name: &str, full_text: String, body: Option<String>) {
        match body {
            Some(body) => {
                self.generated_content.insert(name.to_string(), body);
            }
            None => self.placeholders.push(name.to_string()),
        }
        self.sections.push(full_text);
    }

    pub fn proposal(&self) -> Option<&str> {
        self.proposal.as_deref()
    }

    /// Store the assembled proposal. Later calls replace it.
    pub fn set_proposal(&mut self, proposal: String) {
        self.proposal = Some(proposal);
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}
