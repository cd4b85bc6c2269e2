//! Chat-completion and embedding access for the classifier, sentiment
//! analyzer and knowledge base.
//!
//! A narrow trait pair sits between those consumers and the concrete
//! provider (`rig_provider`, backed by `rig-core`) so the fallback paths
//! -- rule-based classification/sentiment, zero-vector embeddings -- never
//! need to know a provider exists, and tests can swap in a
//! deterministic fake.

mod retry;
mod rig_provider;

pub use retry::{retry_with_backoff, RetryPolicy};
pub use rig_provider::RigChatProvider;

use async_trait::async_trait;

use crate::error::Result;

/// A single chat-completion round trip: system + user prompt in, raw text
/// response out. Callers are responsible for parsing whatever structured
/// format they asked the model for.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimensions(&self) -> usize;
}
