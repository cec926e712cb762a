//! Ordered repair strategies for an assembled proposal.
//!
//! [`RepairChain::run`] validates the document, then applies each strategy
//! in turn until the document validates or the list runs out. A strategy
//! that errors is skipped; a strategy whose output validates worse than its
//! input is discarded.

use crate::backend::Generator;
use crate::prompt;
use async_trait::async_trait;
use draftwright_config::GenerationConfig;
use draftwright_core::{Error, Result};
use draftwright_validation::{StructuralValidator, ValidationReport, normalize};
use tracing::{debug, info, warn};

#[async_trait]
pub trait RepairStrategy: Send + Sync {
    fn name(&self) -> &str;

    async fn repair(&self, document: &str, report: &ValidationReport) -> Result<String>;
}

/// Normalization plus heading renumbering.
pub struct DeterministicRepair;

#[async_trait]
impl RepairStrategy for DeterministicRepair {
    fn name(&self) -> &str {
        "deterministic"
    }

    async fn repair(&self, document: &str, report: &ValidationReport) -> Result<String> {
        Ok(draftwright_validation::repair(document, report))
    }
}

/// Asks the backend to restructure the document.
pub struct BackendRepair {
    generator: Generator,
}

impl BackendRepair {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl RepairStrategy for BackendRepair {
    fn name(&self) -> &str {
        "backend"
    }

    async fn repair(&self, document: &str, report: &ValidationReport) -> Result<String> {
        let issues: Vec<String> = report.issues().collect();
        let answer = self
            .generator
            .generate(&prompt::structure_repair_prompt(document, &issues))
            .await?;
        let repaired = normalize(&answer);
        if repaired.is_empty() {
            return Err(Error::MalformedOutput("backend repair returned an empty document".into()));
        }
        Ok(repaired)
    }
}

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub document: String,
    pub report: ValidationReport,
    /// Strategies whose output was kept, in order
    pub applied: Vec<String>,
}

pub struct RepairChain {
    strategies: Vec<Box<dyn RepairStrategy>>,
    validator: StructuralValidator,
}

impl RepairChain {
    pub fn new(validator: StructuralValidator) -> Self {
        Self {
            strategies: Vec::new(),
            validator,
        }
    }

    /// Deterministic repair only.
    pub fn deterministic() -> Self {
        Self::new(StructuralValidator::default()).push(DeterministicRepair)
    }

    pub fn push(mut self, strategy: impl RepairStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Deterministic repair, followed by backend repair when enabled.
    pub fn from_config(generator: &Generator, config: &GenerationConfig) -> Self {
        let chain = Self::deterministic();
        if config.backend_repair {
            chain.push(BackendRepair::new(generator.clone()))
        } else {
            chain
        }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, document: &str) -> RepairOutcome {
        let mut document = document.to_string();
        let mut report = self.validator.validate(&document);
        let mut applied = Vec::new();

        for strategy in &self.strategies {
            if report.is_valid {
                break;
            }
            let candidate = match strategy.repair(&document, &report).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Repair strategy failed");
                    continue;
                }
            };
            let candidate_report = self.validator.validate(&candidate);
            let before = report.issues().count();
            let after = candidate_report.issues().count();
            if after > before {
                debug!(strategy = strategy.name(), before, after, "Repair made things worse, discarded");
                continue;
            }

            info!(strategy = strategy.name(), before, after, "Repair applied");
            applied.push(strategy.name().to_string());
            document = candidate;
            report = candidate_report;
        }

        RepairOutcome {
            document,
            report,
            applied,
        }
    }
}
