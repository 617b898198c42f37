// Indexer module
// Loads metadata records, embeds their docs in batches and builds the search context


use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::embeddings::{EmbeddingError, TextEmbedder};
use crate::retrieval::error::Result as RetrievalResult;
use crate::retrieval::{
    DistanceMetric, IndexBuilder, MetadataRecord, MetadataTable, RetrievalError, SearchContext,
};

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid metadata record at {location}: {reason}")]
    Parse { location: String, reason: String },

    #[error("Metadata record {entry} has an empty doc")]
    EmptyDoc { entry: usize },

    #[error("No metadata records found in {0}")]
    NoRecords(PathBuf),
}

/// Read metadata records from a JSON array, or from JSON Lines when the file
/// ends in `.jsonl`.
#[inline]
pub fn load_records(path: &Path) -> Result<Vec<MetadataRecord>, IndexerError> {
    let content = fs::read_to_string(path).map_err(|source| IndexerError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_jsonl = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

    let records = if is_jsonl {
        parse_json_lines(&content)?
    } else {
        serde_json::from_str::<Vec<MetadataRecord>>(&content).map_err(|e| IndexerError::Parse {
            location: format!("line {} column {}", e.line(), e.column()),
            reason: e.to_string(),
        })?
    };

    if records.is_empty() {
        return Err(IndexerError::NoRecords(path.to_path_buf()));
    }
    if let Some(entry) = records.iter().position(|r| r.doc.trim().is_empty()) {
        return Err(IndexerError::EmptyDoc { entry: entry + 1 });
    }

    debug!("Loaded {} metadata records from {}", records.len(), path.display());
    Ok(records)
}

fn parse_json_lines(content: &str) -> Result<Vec<MetadataRecord>, IndexerError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).map_err(|e| IndexerError::Parse {
                location: format!("line {}", number + 1),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Embeds metadata docs and assembles a [`SearchContext`] in input order.
#[derive(Debug)]
pub struct Indexer<E> {
    embedder: E,
    builder: IndexBuilder,
    batch_size: usize,
}

impl<E: TextEmbedder> Indexer<E> {
    #[inline]
    pub fn new(embedder: E, metric: DistanceMetric, batch_size: usize) -> Self {
        Self {
            embedder,
            builder: IndexBuilder::new(metric),
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every record's doc and pair the resulting index with the records.
    #[inline]
    pub fn build(&self, records: Vec<MetadataRecord>) -> RetrievalResult<SearchContext> {
        if records.is_empty() {
            return Err(RetrievalError::EmptyInput("metadata records"));
        }

        let docs: Vec<String> = records.iter().map(|r| r.doc.clone()).collect();
        let vectors = self.embed_with_progress(&docs, &progress_bar(docs.len()))?;

        let index = self.builder.build(&vectors)?;
        let context = SearchContext::new(index, MetadataTable::new(records))?;
        info!(
            "Built search context with {} entries (dimension {})",
            context.len(),
            context.index().dimension()
        );
        Ok(context)
    }

    /// Embed `docs` batch by batch. The bar is cleared on success and
    /// abandoned on any failure.
    fn embed_with_progress(
        &self,
        docs: &[String],
        bar: &ProgressBar,
    ) -> RetrievalResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(docs.len());
        for batch in docs.chunks(self.batch_size) {
            let embedded = match self.embedder.embed(batch) {
                Ok(embedded) => embedded,
                Err(e) => {
                    bar.abandon();
                    return Err(e.into());
                }
            };
            if embedded.len() != batch.len() {
                bar.abandon();
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: embedded.len(),
                }
                .into());
            }
            vectors.extend(embedded);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();
        Ok(vectors)
    }

    /// [`Indexer::build`] followed by an atomic save to `destination`.
    #[inline]
    pub fn build_and_save(
        &self,
        records: Vec<MetadataRecord>,
        destination: &Path,
    ) -> RetrievalResult<SearchContext> {
        let context = self.build(records)?;
        context.save(destination)?;
        Ok(context)
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding metadata {bar:30}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len as u64).with_style(style)
}
