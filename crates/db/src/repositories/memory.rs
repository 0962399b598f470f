use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use productai_core::{EmbeddedChunk, ScoredChunk, SourceDocument};

use super::{ChunkStore, InsertOutcome, RepositoryError};
use crate::vectors::{cosine_similarity, top_k};

#[derive(Default)]
struct MemoryIndex {
    document_hashes: HashSet<String>,
    chunk_hashes: HashSet<String>,
    chunks: Vec<(String, EmbeddedChunk)>,
}

#[derive(Default)]
pub struct InMemoryChunkStore {
    index: RwLock<MemoryIndex>,
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn insert_document(
        &self,
        document: &SourceDocument,
        chunks: &[EmbeddedChunk],
    ) -> Result<InsertOutcome, RepositoryError> {
        let mut index = self.index.write().await;
        if !index.document_hashes.insert(document.content_hash.0.clone()) {
            return Ok(InsertOutcome { inserted: 0, skipped: chunks.len() });
        }

        let mut outcome = InsertOutcome::default();
        for chunk in chunks {
            if index.chunk_hashes.insert(chunk.content_hash.0.clone()) {
                index.chunks.push((document.source_path.clone(), chunk.clone()));
                outcome.inserted += 1;
            } else {
                outcome.skipped += 1;
            }
        }
        Ok(outcome)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RepositoryError> {
        let index = self.index.read().await;
        let mut scored = Vec::with_capacity(index.chunks.len());
        for (source_path, chunk) in &index.chunks {
            if chunk.embedding.len() != query_embedding.len() {
                return Err(RepositoryError::DimensionMismatch {
                    stored: chunk.embedding.len(),
                    query: query_embedding.len(),
                });
            }
            scored.push(ScoredChunk {
                source_path: source_path.clone(),
                content: chunk.content.clone(),
                score: cosine_similarity(query_embedding, &chunk.embedding),
            });
        }
        Ok(top_k(scored, limit))
    }

    async fn count_chunks(&self) -> Result<u64, RepositoryError> {
        Ok(self.index.read().await.chunks.len() as u64)
    }
}
