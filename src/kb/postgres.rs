//! `pgvector`-backed knowledge base storage.
//!
//! Follows the `deadpool_postgres::Pool` + raw `tokio_postgres` query style
//! used throughout the teacher's workspace storage
//! (`src/workspace/tasks.rs`, `src/workspace/learnings.rs`): pull a client
//! from the pool per call, hand-write the SQL, map rows back by position.

use async_trait::async_trait;
use pgvector::Vector;
use uuid::Uuid;

use crate::domain::{KbDocument, KbDocumentKind};
use crate::error::{AppError, Result};

use super::{ScoredDocument, VectorStore};

pub struct PgVectorStore {
    pool: deadpool_postgres::Pool,
}

impl PgVectorStore {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }

    /// Creates the `kb_documents` table and its ivfflat index if missing.
    /// Expects the `vector` extension to already be enabled on the database.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS kb_documents (
                    id UUID PRIMARY KEY,
                    kind TEXT NOT NULL,
                    category TEXT,
                    text TEXT NOT NULL,
                    response TEXT,
                    rating DOUBLE PRECISION,
                    embedding VECTOR(1536) NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL
                );
                CREATE INDEX IF NOT EXISTS kb_documents_embedding_idx
                    ON kb_documents USING ivfflat (embedding vector_cosine_ops);",
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}

fn kind_to_sql(kind: KbDocumentKind) -> &'static str {
    match kind {
        KbDocumentKind::Document => "document",
        KbDocumentKind::ResolvedTicket => "resolved_ticket",
        KbDocumentKind::Faq => "faq",
    }
}

fn kind_from_sql(s: &str) -> KbDocumentKind {
    match s {
        "resolved_ticket" => KbDocumentKind::ResolvedTicket,
        "faq" => KbDocumentKind::Faq,
        _ => KbDocumentKind::Document,
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn upsert(&self, document: KbDocument, embedding: Vec<f32>) -> Result<()> {
        let client = self.pool.get().await?;
        let vector = Vector::from(embedding);
        client
            .execute(
                "INSERT INTO kb_documents (id, kind, category, text, response, rating, embedding, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (id) DO UPDATE SET
                    kind = EXCLUDED.kind, category = EXCLUDED.category, text = EXCLUDED.text,
                    response = EXCLUDED.response, rating = EXCLUDED.rating, embedding = EXCLUDED.embedding",
                &[
                    &document.id,
                    &kind_to_sql(document.kind),
                    &document.category,
                    &document.text,
                    &document.response,
                    &document.rating,
                    &vector,
                    &document.created_at,
                ],
            )
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    async fn find_similar(
        &self,
        query_embedding: &[f32],
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let client = self.pool.get().await?;
        let vector = Vector::from(query_embedding.to_vec());
        let limit = limit as i64;

        let rows = if let Some(category) = category {
            client
                .query(
                    "SELECT id, kind, category, text, response, rating, created_at,
                            1 - (embedding <=> $1) AS score
                     FROM kb_documents WHERE category = $2
                     ORDER BY embedding <=> $1 LIMIT $3",
                    &[&vector, &category, &limit],
                )
                .await
        } else {
            client
                .query(
                    "SELECT id, kind, category, text, response, rating, created_at,
                            1 - (embedding <=> $1) AS score
                     FROM kb_documents ORDER BY embedding <=> $1 LIMIT $2",
                    &[&vector, &limit],
                )
                .await
        }
        .map_err(AppError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| ScoredDocument {
                document: KbDocument {
                    id: row.get(0),
                    kind: kind_from_sql(row.get::<_, &str>(1)),
                    category: row.get(2),
                    text: row.get(3),
                    response: row.get(4),
                    rating: row.get(5),
                    created_at: row.get(6),
                },
                score: row.get(7),
            })
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("DELETE FROM kb_documents WHERE id = $1", &[&id]).await.map_err(AppError::from)?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let client = self.pool.get().await?;
        let row = client.query_one("SELECT COUNT(*) FROM kb_documents", &[]).await.map_err(AppError::from)?;
        let count: i64 = row.get(0);
        Ok(count as usize)
    }
}
