use async_trait::async_trait;
use thiserror::Error;

use productai_core::{EmbeddedChunk, ScoredChunk, SourceDocument};

pub mod chunk;
pub mod memory;

pub use chunk::SqlChunkStore;
pub use memory::InMemoryChunkStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("embedding dimension mismatch: index holds {stored}, query has {query}")]
    DimensionMismatch { stored: usize, query: usize },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

/// Storage for embedded document chunks with similarity retrieval.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Stores a document and its chunks. A document whose content hash is
    /// already indexed is skipped entirely; individual chunks already present
    /// (by content hash) are skipped.
    async fn insert_document(
        &self,
        document: &SourceDocument,
        chunks: &[EmbeddedChunk],
    ) -> Result<InsertOutcome, RepositoryError>;

    /// Returns up to `limit` chunks ordered by descending cosine similarity.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RepositoryError>;

    async fn count_chunks(&self) -> Result<u64, RepositoryError>;
}
