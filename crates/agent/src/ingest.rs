//! Builds the FAQ index from source documents.
//!
//! PDFs go through text extraction; every other file is read as UTF-8.
//! Documents are split, embedded in batches and stored. Content
//! that is already indexed is skipped, so re-running an ingest is harmless.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use productai_core::{EmbeddedChunk, SourceDocument, TextSplitter};
use productai_db::{ChunkStore, RepositoryError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::{Embedder, LlmError};

pub const EMBEDDING_BATCH_SIZE: usize = 32;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{path}` is not valid UTF-8 text")]
    Encoding { path: PathBuf },
    #[error("could not extract text from `{path}`: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("`{path}` contains no text to index")]
    Empty { path: PathBuf },
    #[error("embedding request failed: {0}")]
    Embed(#[from] LlmError),
    #[error("embedder returned {actual} vectors for {expected} chunks")]
    EmbeddingCount { expected: usize, actual: usize },
    #[error("index write failed: {0}")]
    Store(#[from] RepositoryError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks_inserted: usize,
    pub chunks_skipped: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Pdf,
}

fn document_kind(path: &Path) -> DocumentKind {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) if extension.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
        _ => DocumentKind::Text,
    }
}

pub async fn load_document(path: &Path) -> Result<String, IngestError> {
    let kind = document_kind(path);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| IngestError::Read { path: path.into(), source })?;

    match kind {
        DocumentKind::Text => {
            String::from_utf8(bytes).map_err(|_| IngestError::Encoding { path: path.into() })
        }
        DocumentKind::Pdf => {
            let extracted = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|error| error.to_string())
            })
            .await
            .map_err(|error| IngestError::Pdf { path: path.into(), message: error.to_string() })?;
            extracted.map_err(|message| IngestError::Pdf { path: path.into(), message })
        }
    }
}

pub struct Ingestor {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    splitter: TextSplitter,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ChunkStore>, embedder: Arc<dyn Embedder>, splitter: TextSplitter) -> Self {
        Self { store, embedder, splitter, batch_size: EMBEDDING_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport, IngestError> {
        let mut report = IngestReport::default();
        for path in paths {
            let text = load_document(path).await?;
            let outcome = self.ingest_text(&path.display().to_string(), &text).await?;
            if outcome.chunks == 0 {
                warn!(event_name = "ingest.document.empty", path = %path.display(), "document has no text");
                return Err(IngestError::Empty { path: path.clone() });
            }
            report.documents += 1;
            report.chunks_inserted += outcome.inserted;
            report.chunks_skipped += outcome.skipped;
        }

        info!(
            event_name = "ingest.completed",
            documents = report.documents,
            chunks_inserted = report.chunks_inserted,
            chunks_skipped = report.chunks_skipped,
            "ingest finished"
        );
        Ok(report)
    }

    pub async fn ingest_text(&self, source_path: &str, text: &str) -> Result<TextOutcome, IngestError> {
        let pieces = self.splitter.split(text);
        if pieces.is_empty() {
            return Ok(TextOutcome::default());
        }

        let mut chunks = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(self.batch_size) {
            let embeddings = self.embedder.embed_batch(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(IngestError::EmbeddingCount {
                    expected: batch.len(),
                    actual: embeddings.len(),
                });
            }
            for (content, embedding) in batch.iter().zip(embeddings) {
                chunks.push(EmbeddedChunk::new(chunks.len() as u32, content.as_str(), embedding));
            }
        }

        let document = SourceDocument::new(source_path, text);
        let outcome = self.store.insert_document(&document, &chunks).await?;
        info!(
            event_name = "ingest.document.stored",
            source_path,
            content_hash = %document.content_hash,
            inserted = outcome.inserted,
            skipped = outcome.skipped,
        );
        Ok(TextOutcome { chunks: chunks.len(), inserted: outcome.inserted, skipped: outcome.skipped })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextOutcome {
    pub chunks: usize,
    pub inserted: usize,
    pub skipped: usize,
}
