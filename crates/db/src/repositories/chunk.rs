use async_trait::async_trait;
use chrono::Utc;

use productai_core::{EmbeddedChunk, ScoredChunk, SourceDocument};

use super::{ChunkStore, InsertOutcome, RepositoryError};
use crate::vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes, top_k};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlChunkStore {
    pool: DbPool,
}

impl SqlChunkStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for SqlChunkStore {
    async fn insert_document(
        &self,
        document: &SourceDocument,
        chunks: &[EmbeddedChunk],
    ) -> Result<InsertOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted_document = sqlx::query(
            "INSERT OR IGNORE INTO document (source_path, content_hash, ingested_at)
             VALUES (?, ?, ?)",
        )
        .bind(&document.source_path)
        .bind(&document.content_hash.0)
        .bind(document.ingested_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if inserted_document.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(InsertOutcome { inserted: 0, skipped: chunks.len() });
        }
        let document_id = inserted_document.last_insert_rowid();

        let created_at = Utc::now().to_rfc3339();
        let mut outcome = InsertOutcome::default();
        for chunk in chunks {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO chunk
                 (document_id, ordinal, content, content_hash, embedding, dimensions, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(document_id)
            .bind(i64::from(chunk.ordinal))
            .bind(&chunk.content)
            .bind(&chunk.content_hash.0)
            .bind(embedding_to_bytes(&chunk.embedding))
            .bind(chunk.embedding.len() as i64)
            .bind(&created_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                outcome.skipped += 1;
            } else {
                outcome.inserted += 1;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RepositoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, Vec<u8>, i64)> = sqlx::query_as(
            "SELECT d.source_path, c.content, c.embedding, c.dimensions
             FROM chunk c
             JOIN document d ON d.id = c.document_id
             ORDER BY c.id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for (source_path, content, embedding, dimensions) in rows {
            let stored = usize::try_from(dimensions)
                .map_err(|_| RepositoryError::Decode(format!("negative dimensions {dimensions}")))?;
            if stored != query_embedding.len() {
                return Err(RepositoryError::DimensionMismatch {
                    stored,
                    query: query_embedding.len(),
                });
            }
            let embedding = bytes_to_embedding(&embedding);
            if embedding.len() != stored {
                return Err(RepositoryError::Decode(format!(
                    "chunk embedding has {} values, expected {stored}",
                    embedding.len()
                )));
            }
            let score = cosine_similarity(query_embedding, &embedding);
            scored.push(ScoredChunk { source_path, content, score });
        }

        Ok(top_k(scored, limit))
    }

    async fn count_chunks(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk").fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}
