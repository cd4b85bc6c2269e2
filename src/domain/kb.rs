use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KbDocumentKind {
    Document,
    ResolvedTicket,
    Faq,
}

/// A unit stored in the knowledge base's vector index: a document, a past
/// resolved ticket, or an FAQ entry, each carrying the text that was
/// embedded plus enough metadata to filter and cite it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbDocument {
    pub id: Uuid,
    pub kind: KbDocumentKind,
    pub category: Option<String>,
    pub text: String,
    pub response: Option<String>,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedResponseSource {
    Rag,
    AiGenerated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedResponse {
    pub text: String,
    pub source: SuggestedResponseSource,
    pub relevance: f64,
    pub source_document_id: Option<Uuid>,
}
