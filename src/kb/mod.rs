//! Knowledge base: vector-similarity storage over resolved tickets, FAQs
//! and free-form documents, used to generate suggested responses.
//!
//! Grounded on `original_source/src/services/rag.py`'s `KnowledgeBase`.
//! ChromaDB has no idiomatic Rust client in this ecosystem, so storage is
//! behind a `VectorStore` trait: an in-memory cosine-similarity impl here
//! (the direct analogue of the source's own `InMemoryCollection` fallback)
//! and a `pgvector`-backed impl in `postgres.rs` for the feature-gated
//! persistent path.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryVectorStore;
#[cfg(feature = "postgres")]
pub use postgres::PgVectorStore;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{KbDocument, KbDocumentKind, SuggestedResponse, SuggestedResponseSource};
use crate::error::Result;
use crate::llm::{retry_with_backoff, ChatProvider, EmbeddingProvider, RetryPolicy};

#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: KbDocument,
    pub score: f64,
}

/// Storage and nearest-neighbour search over embedded documents. Kept
/// narrow so the in-memory and `pgvector` implementations can be swapped
/// without touching `KnowledgeBase`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, document: KbDocument, embedding: Vec<f32>) -> Result<()>;

    async fn find_similar(
        &self,
        query_embedding: &[f32],
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}

pub struct KnowledgeBase {
    store: Arc<dyn VectorStore>,
    embedder: Option<Box<dyn EmbeddingProvider>>,
    chat: Option<Box<dyn ChatProvider>>,
    retry_policy: RetryPolicy,
    min_score: f64,
}

impl KnowledgeBase {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Option<Box<dyn EmbeddingProvider>>,
        chat: Option<Box<dyn ChatProvider>>,
    ) -> Self {
        Self { store, embedder, chat, retry_policy: RetryPolicy::default(), min_score: 0.5 }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.embedder {
            Some(embedder) => {
                let truncated = crate::text::truncate(text, 8000, "");
                retry_with_backoff(self.retry_policy, || async { embedder.embed(&truncated).await }).await
            }
            None => Ok(vec![0.0; 1536]),
        }
    }

    pub async fn add_document(
        &self,
        kind: KbDocumentKind,
        text: String,
        category: Option<String>,
        response: Option<String>,
        rating: Option<f64>,
    ) -> Result<Uuid> {
        let embedding = self.embed(&text).await?;
        let id = Uuid::new_v4();
        let document = KbDocument {
            id,
            kind,
            category,
            text,
            response,
            rating,
            created_at: chrono::Utc::now(),
        };
        self.store.upsert(document, embedding).await?;
        Ok(id)
    }

    /// Only well-rated resolutions are worth recommending back to future
    /// tickets; anything below 3 is dropped silently, matching the source.
    pub async fn add_resolved_ticket(
        &self,
        question: String,
        response: String,
        category: String,
        rating: Option<f64>,
    ) -> Result<Option<Uuid>> {
        if rating.is_some_and(|r| r < 3.0) {
            return Ok(None);
        }
        let text = format!("Question: {question}\n\nResponse: {response}");
        self.add_document(KbDocumentKind::ResolvedTicket, text, Some(category), Some(response_owned(&response)), rating)
            .await
            .map(Some)
    }

    pub async fn add_faq(&self, question: String, answer: String, category: Option<String>) -> Result<Uuid> {
        let text = format!("FAQ: {question}\n\nAnswer: {answer}");
        self.add_document(KbDocumentKind::Faq, text, category, Some(answer), None).await
    }

    pub async fn find_similar(&self, query: &str, category: Option<&str>, limit: usize) -> Result<Vec<ScoredDocument>> {
        let embedding = self.embed(query).await?;
        let results = self.store.find_similar(&embedding, category, limit).await?;
        Ok(results.into_iter().filter(|r| r.score >= self.min_score).collect())
    }

    pub async fn generate_suggested_responses(
        &self,
        ticket_content: &str,
        category: Option<&str>,
        language: &str,
        limit: usize,
    ) -> Result<Vec<SuggestedResponse>> {
        let similar = self.find_similar(ticket_content, category, 5).await.unwrap_or_default();

        let mut suggestions: Vec<SuggestedResponse> = similar
            .iter()
            .take(limit)
            .map(|scored| SuggestedResponse {
                text: extract_response(&scored.document.text),
                source: SuggestedResponseSource::Rag,
                relevance: scored.score,
                source_document_id: Some(scored.document.id),
            })
            .collect();

        if suggestions.len() < limit {
            if let Some(chat) = &self.chat {
                let references: Vec<&str> = similar.iter().take(3).map(|s| s.document.text.as_str()).collect();
                match self.generate_ai_response(chat.as_ref(), ticket_content, &references, category, language).await {
                    Ok(text) => suggestions.push(SuggestedResponse {
                        text,
                        source: SuggestedResponseSource::AiGenerated,
                        relevance: 0.9,
                        source_document_id: None,
                    }),
                    Err(err) => {
                        tracing::warn!(error = %err, "AI suggested-response generation failed");
                    }
                }
            }
        }

        suggestions.truncate(limit);
        Ok(suggestions)
    }

    async fn generate_ai_response(
        &self,
        chat: &dyn ChatProvider,
        ticket_content: &str,
        references: &[&str],
        category: Option<&str>,
        language: &str,
    ) -> Result<String> {
        let lang_instruction = if language == "tr" { "Respond in Turkish.".to_string() } else { format!("Respond in {language}.") };

        let (system_prompt, user_prompt) = if references.is_empty() {
            let category_context = category.map(|c| format!("This is a {c} inquiry.")).unwrap_or_default();
            (
                format!(
                    "You are a professional customer support expert. Provide concise, accurate, and helpful responses.\n\
                     Rules:\n1. Be professional but brief.\n2. Provide clear and actionable information immediately.\n\
                     3. Avoid filler words and long-winded explanations.\n4. Limit response to 3-4 sentences if possible.\n5. {lang_instruction}"
                ),
                format!("Customer message:\n{ticket_content}\n\n{category_context}\n\nWrite a professional and helpful response for this customer:"),
            )
        } else {
            let context = references.iter().map(|r| format!("Reference:\n{r}\n")).collect::<Vec<_>>().join("\n---\n");
            (
                format!(
                    "You are a professional customer support expert. Generate a concise and helpful response based on the provided reference responses.\n\
                     Rules:\n1. Don't copy references directly, adapt them to the specific question.\n2. Be professional and direct.\n\
                     3. Keep it very concise.\n4. Use bullet points for steps if suitable.\n5. Limit response to 3-4 sentences if possible.\n6. {lang_instruction}"
                ),
                format!("Customer message:\n{ticket_content}\n\nReference responses:\n{context}\n\nWrite an appropriate response for this customer:"),
            )
        };

        retry_with_backoff(self.retry_policy, || async { chat.complete(&system_prompt, &user_prompt).await }).await
    }

    pub async fn delete_document(&self, id: Uuid) -> Result<()> {
        self.store.delete(id).await
    }

    pub async fn document_count(&self) -> Result<usize> {
        self.store.count().await
    }
}

fn response_owned(response: &str) -> String {
    response.to_string()
}

fn extract_response(content: &str) -> String {
    if let Some(idx) = content.find("Response:") {
        content[idx + "Response:".len()..].trim().to_string()
    } else if let Some(idx) = content.find("Answer:") {
        content[idx + "Answer:".len()..].trim().to_string()
    } else {
        content.to_string()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_response_part_from_stored_qa_pair() {
        let content = "Question: how do I reset my password?\n\nResponse: Use the forgot password link.";
        assert_eq!(extract_response(content), "Use the forgot password link.");
    }

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0_f32, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        let a = vec![0.0_f32, 0.0];
        let b = vec![1.0_f32, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
