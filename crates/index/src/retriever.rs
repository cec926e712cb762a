//! Section-aware retrieval.
//!
//! For each proposal section the retriever over-fetches candidates from the
//! [`PassageIndex`], keeps the ones that mention the section (by identity
//! variant), and falls back to the unfiltered candidates when none do.
//! Retrieval never fails the caller: backend or index errors degrade to an
//! empty result with [`RetrievalStatus::Failed`].

use crate::passage_index::{IndexStatus, PassageIndex};
use draftwright_config::RetrievalConfig;
use draftwright_core::identity::{SectionIdentity, fallback_variant};
use draftwright_core::passage::{RetrievalResult, ScoredPassage};
use draftwright_core::requirement::truncate_chars;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a retrieval call went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalStatus {
    Ready,
    /// Nothing indexed yet
    NotReady,
    /// The index or embedder errored; results are empty
    Failed,
}

#[derive(Debug, Clone)]
pub struct SectionRetrieval {
    pub status: RetrievalStatus,
    pub results: Vec<RetrievalResult>,
    /// True when at least one candidate matched a section variant
    pub filtered: bool,
}

impl SectionRetrieval {
    fn empty(status: RetrievalStatus) -> Self {
        Self {
            status,
            results: Vec::new(),
            filtered: false,
        }
    }
}

pub struct SectionRetriever {
    index: Arc<PassageIndex>,
    overfetch_factor: usize,
    excerpt_chars: usize,
}

impl SectionRetriever {
    pub fn new(index: Arc<PassageIndex>, overfetch_factor: usize, excerpt_chars: usize) -> Self {
        Self {
            index,
            overfetch_factor: overfetch_factor.max(1),
            excerpt_chars,
        }
    }

    pub fn from_config(index: Arc<PassageIndex>, config: &RetrievalConfig) -> Self {
        Self::new(index, config.overfetch_factor, config.requirement_excerpt_chars)
    }

    pub fn index(&self) -> &Arc<PassageIndex> {
        &self.index
    }

    /// `"Section: <name>. <excerpt>"`
    pub fn build_query(&self, section_name: &str, requirement_context: &str) -> String {
        let excerpt = truncate_chars(requirement_context.trim(), self.excerpt_chars);
        format!("Section: {section_name}. {excerpt}")
    }

    /// Lowercase substrings that mark a passage as relevant to the section.
    pub fn variants(section_name: &str) -> Vec<String> {
        match SectionIdentity::detect(section_name) {
            Some(identity) => identity
                .retrieval_variants()
                .iter()
                .map(|v| v.to_lowercase())
                .collect(),
            None => {
                let fallback = fallback_variant(section_name);
                if fallback.is_empty() {
                    Vec::new()
                } else {
                    vec![fallback]
                }
            }
        }
    }

    /// Up to `k` precedent passages for `section_name`.
    pub async fn retrieve(
        &self,
        section_name: &str,
        requirement_context: &str,
        k: usize,
    ) -> SectionRetrieval {
        let query = self.build_query(section_name, requirement_context);
        let fetch = k.saturating_mul(self.overfetch_factor);

        let result = match self.index.query(&query, fetch).await {
            Ok(r) => r,
            Err(e) => {
                warn!(section = %section_name, error = %e, "Retrieval failed, continuing without precedent");
                return SectionRetrieval::empty(RetrievalStatus::Failed);
            }
        };
        if result.status == IndexStatus::NotReady {
            debug!(section = %section_name, "Index not ready, no precedent retrieved");
            return SectionRetrieval::empty(RetrievalStatus::NotReady);
        }

        let variants = Self::variants(section_name);
        let (mut selected, filtered) = filter_by_variants(result.hits, &variants);
        selected.truncate(k);

        debug!(
            section = %section_name,
            candidates = fetch,
            returned = selected.len(),
            filtered,
            "Section retrieval complete"
        );

        SectionRetrieval {
            status: RetrievalStatus::Ready,
            results: selected.into_iter().map(RetrievalResult::from).collect(),
            filtered,
        }
    }
}

/// Keep candidates whose text contains any variant; all of them if none do.
fn filter_by_variants(
    candidates: Vec<ScoredPassage>,
    variants: &[String],
) -> (Vec<ScoredPassage>, bool) {
    let matches = |hit: &ScoredPassage| {
        let text = hit.passage.text.to_lowercase();
        variants.iter().any(|v| text.contains(v.as_str()))
    };

    if candidates.iter().any(matches) {
        (candidates.into_iter().filter(matches).collect(), true)
    } else {
        (candidates, false)
    }
}
