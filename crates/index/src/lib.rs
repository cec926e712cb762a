//! Passage indexing and section-aware retrieval for draftwright.
//!
//! Offline, a corpus of prior proposals is chunked ([`Chunker`]), embedded,
//! and stored in a [`PassageIndex`]. Per synthesis run, the
//! [`SectionRetriever`] pulls precedent passages for each section.

pub mod chunker;
pub mod corpus;
pub mod embedder;
pub mod passage_index;
pub mod retriever;
pub mod vector;

pub use chunker::Chunker;
pub use corpus::{CorpusDocument, IndexOutcome, IndexStats, index_corpus, load_corpus, project_code};
pub use embedder::HashingEmbedder;
pub use passage_index::{IndexStatus, IndexedPassage, PassageIndex, QueryResult};
pub use retriever::{RetrievalStatus, SectionRetrieval, SectionRetriever};
pub use vector::{cosine_similarity, rank_by_similarity};
