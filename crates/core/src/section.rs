//! Section outline entries.

use serde::{Deserialize, Serialize};

/// One proposal section to generate, in outline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    pub description: String,
    pub order: usize,
}

impl SectionSpec {
    /// Build an ordered outline from `(name, description)` pairs.
    ///
    /// Order is the position in the input, which must stay stable for the
    /// whole run.
    pub fn outline<I, N, D>(entries: I) -> Vec<SectionSpec>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<String>,
    {
        entries
            .into_iter()
            .enumerate()
            .map(|(order, (name, description))| SectionSpec {
                name: name.into(),
                description: description.into(),
                order,
            })
            .collect()
    }

    /// Heading title: uppercase with underscores as spaces
    /// (`plan_de_trabajo` → `PLAN DE TRABAJO`).
    pub fn display_title(&self) -> String {
        self.name.replace('_', " ").trim().to_uppercase()
    }
}
