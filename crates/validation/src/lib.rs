//! Text hygiene for generated proposals.
//!
//! - [`normalize`] cleans any block of generated text (idempotent).
//! - [`validate`] checks an assembled proposal against structure, content,
//!   and numbering rules and returns a [`ValidationReport`].
//! - [`repair`] is the deterministic best-effort fix for a failed report.
//! - [`repair_outline`] turns a malformed `{KEY: description}` answer from
//!   the backend into a usable section outline.
//!
//! All heading and numbering patterns live in [`grammar`] so detection and
//! repair read the same definitions.

pub mod grammar;
pub mod normalizer;
pub mod outline;
pub mod repair;
pub mod validator;

pub use normalizer::{normalize, normalize_section_body};
pub use outline::{OutlineRepair, OutlineStrategy, default_outline, extract_json_object, repair_outline};
pub use repair::repair;
pub use validator::{RuleResult, StructuralValidator, ValidationReport, ValidationRules, validate};
