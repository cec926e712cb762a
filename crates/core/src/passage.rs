//! Passages and retrieval results.
//!
//! A [`Passage`] is a bounded chunk of a prior proposal document. Passages
//! are created by the chunker during indexing and never mutated afterwards;
//! the only way to remove one is a full reindex.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag keys attached to every indexed passage.
pub const TAG_SOURCE: &str = "source";
pub const TAG_PROJECT_NAME: &str = "project_name";
pub const TAG_PROJECT_CODE: &str = "project_code";
pub const TAG_FILE_TYPE: &str = "file_type";

/// An immutable chunk of corpus text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Unique within an index: `{source_document_id}#{chunk_index}`
    pub id: String,

    /// The chunk text
    pub text: String,

    /// The document this passage was cut from (file stem)
    pub source_document_id: String,

    /// Position of this chunk within its document
    pub chunk_index: usize,

    /// Free-form metadata (source path, project name/code, file type)
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Passage {
    pub fn new(source_document_id: impl Into<String>, chunk_index: usize, text: impl Into<String>) -> Self {
        let source_document_id = source_document_id.into();
        Self {
            id: format!("{source_document_id}#{chunk_index}"),
            text: text.into(),
            source_document_id,
            chunk_index,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags.insert(key.to_string(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// A passage paired with its query score.
///
/// Score is cosine similarity: higher means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

/// One precedent handed to section generation. Ephemeral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub project_name: String,
    pub project_code: String,
    pub passage_text: String,
    pub score: f32,
    pub source: String,
}

impl From<ScoredPassage> for RetrievalResult {
    fn from(scored: ScoredPassage) -> Self {
        let passage = scored.passage;
        let project_name = passage
            .tag(TAG_PROJECT_NAME)
            .unwrap_or(&passage.source_document_id)
            .to_string();
        let project_code = passage
            .tag(TAG_PROJECT_CODE)
            .unwrap_or(&passage.source_document_id)
            .to_string();
        let source = passage.tag(TAG_SOURCE).unwrap_or_default().to_string();
        Self {
            project_name,
            project_code,
            passage_text: passage.text,
            score: scored.score,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passage_id_combines_document_and_chunk() {
        let p = Passage::new("PKS-101 Hospital", 3, "text");
        assert_eq!(p.id, "PKS-101 Hospital#3");
        assert_eq!(p.chunk_index, 3);
    }

    #[test]
    fn retrieval_result_reads_tags() {
        let p = Passage::new("doc", 0, "body")
            .with_tag(TAG_PROJECT_NAME, "Puerto Norte")
            .with_tag(TAG_PROJECT_CODE, "PN-22")
            .with_tag(TAG_SOURCE, "/corpus/doc.md");
        let r = RetrievalResult::from(ScoredPassage {
            passage: p,
            score: 0.8,
        });
        assert_eq!(r.project_name, "Puerto Norte");
        assert_eq!(r.project_code, "PN-22");
        assert_eq!(r.source, "/corpus/doc.md");
        assert_eq!(r.passage_text, "body");
    }

    #[test]
    fn retrieval_result_falls_back_to_document_id() {
        let r = RetrievalResult::from(ScoredPassage {
            passage: Passage::new("doc", 0, "body"),
            score: 0.1,
        });
        assert_eq!(r.project_name, "doc");
        assert_eq!(r.project_code, "doc");
        assert_eq!(r.source, "");
    }
}
