//! In-memory vector store, the direct analogue of
//! `original_source/src/services/rag.py`'s `InMemoryCollection` fallback.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::KbDocument;
use crate::error::Result;

use super::{cosine_similarity, ScoredDocument, VectorStore};

#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<HashMap<Uuid, (KbDocument, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, document: KbDocument, embedding: Vec<f32>) -> Result<()> {
        self.entries.write().insert(document.id, (document, embedding));
        Ok(())
    }

    async fn find_similar(
        &self,
        query_embedding: &[f32],
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let entries = self.entries.read();
        let mut scored: Vec<ScoredDocument> = entries
            .values()
            .filter(|(doc, _)| category.is_none_or(|c| doc.category.as_deref() == Some(c)))
            .map(|(doc, emb)| ScoredDocument { document: doc.clone(), score: cosine_similarity(query_embedding, emb) })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.entries.write().remove(&id);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KbDocumentKind;

    fn doc(category: &str) -> KbDocument {
        KbDocument {
            id: Uuid::new_v4(),
            kind: KbDocumentKind::Faq,
            category: Some(category.to_string()),
            text: "sample".to_string(),
            response: None,
            rating: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn find_similar_filters_by_category_and_ranks_by_score() {
        let store = InMemoryVectorStore::new();
        store.upsert(doc("billing_question"), vec![1.0, 0.0]).await.unwrap();
        store.upsert(doc("technical_issue"), vec![0.0, 1.0]).await.unwrap();

        let results = store.find_similar(&[1.0, 0.0], Some("billing_question"), 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.9);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryVectorStore::new();
        let document = doc("faq");
        let id = document.id;
        store.upsert(document, vec![1.0]).await.unwrap();
        store.delete(id).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
