//! Corpus loading and batch index builds.
//!
//! A corpus is a directory tree of prior proposals already converted to
//! text. Each file becomes one [`CorpusDocument`]; its chunks become tagged
//! [`Passage`]s in the index.

use crate::chunker::Chunker;
use crate::passage_index::PassageIndex;
use draftwright_core::error::IndexError;
use draftwright_core::passage::{
    Passage, TAG_FILE_TYPE, TAG_PROJECT_CODE, TAG_PROJECT_NAME, TAG_SOURCE,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TAG_CHUNK_ID: &str = "chunk_id";

/// One prior proposal, as plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    /// File stem
    pub id: String,
    pub path: PathBuf,
    pub text: String,
}

impl CorpusDocument {
    /// Chunk this document into tagged passages.
    pub fn passages(&self, chunker: &Chunker) -> Vec<Passage> {
        let source = self.path.display().to_string();
        let code = project_code(&self.id);
        let file_type = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        chunker
            .chunk(&self.text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                Passage::new(&self.id, i, text)
                    .with_tag(TAG_SOURCE, source.clone())
                    .with_tag(TAG_PROJECT_NAME, self.id.clone())
                    .with_tag(TAG_PROJECT_CODE, code.clone())
                    .with_tag(TAG_FILE_TYPE, file_type.clone())
                    .with_tag(TAG_CHUNK_ID, i.to_string())
            })
            .collect()
    }
}

/// Project code from a file stem: the first token containing a digit
/// (`"PKS-537"` in `"PKS-537 Portal Ciudadano"`), else the whole stem.
pub fn project_code(stem: &str) -> String {
    stem.split(|c: char| c.is_whitespace() || c == '_')
        .find(|token| token.chars().any(|c| c.is_ascii_digit()))
        .unwrap_or(stem)
        .to_string()
}

/// Read every file under `dir` whose extension is in `extensions`.
///
/// Files are visited in sorted path order. Unreadable files are logged and
/// skipped, as are files with no text.
pub fn load_corpus(dir: &Path, extensions: &[String]) -> Result<Vec<CorpusDocument>, IndexError> {
    if !dir.is_dir() {
        return Err(IndexError::Corpus {
            path: dir.display().to_string(),
            reason: "not a directory".into(),
        });
    }

    let mut files = Vec::new();
    collect_files(dir, extensions, &mut files)?;
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable corpus file");
                continue;
            }
        };
        if text.trim().is_empty() {
            debug!(path = %path.display(), "Skipping empty corpus file");
            continue;
        }
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        documents.push(CorpusDocument { id, path, text });
    }

    info!(dir = %dir.display(), documents = documents.len(), "Corpus loaded");
    Ok(documents)
}

fn collect_files(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<(), IndexError> {
    let entries = std::fs::read_dir(dir).map_err(|e| IndexError::Corpus {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, extensions, out)?;
        } else if has_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)))
}

/// Counts from a completed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub passages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The index already had content and no rebuild was forced.
    Skipped { passages: usize },
    Built(IndexStats),
}

/// Chunk and embed a corpus into `index`.
///
/// When the index already holds passages and `force` is false this is a
/// no-op. Otherwise the index is cleared and rebuilt from all documents.
pub async fn index_corpus(
    index: &PassageIndex,
    documents: &[CorpusDocument],
    chunker: &Chunker,
    force: bool,
) -> Result<IndexOutcome, IndexError> {
    let existing = index.len().await;
    if existing > 0 && !force {
        info!(passages = existing, "Index already built, skipping (use force to rebuild)");
        return Ok(IndexOutcome::Skipped { passages: existing });
    }

    let passages: Vec<Passage> = documents
        .iter()
        .flat_map(|doc| {
            let passages = doc.passages(chunker);
            debug!(document = %doc.id, passages = passages.len(), "Document chunked");
            passages
        })
        .collect();

    let count = index.rebuild(passages).await?;
    if count == 0 {
        warn!("Corpus produced no passages; index is not ready");
    }

    Ok(IndexOutcome::Built(IndexStats {
        documents: documents.len(),
        passages: count,
    }))
}
