//! `rig-core`-backed implementation of [`super::ChatProvider`] and
//! [`super::EmbeddingProvider`].
//!
//! `rig-core` already sits in the teacher's dependency tree as the
//! multi-provider LLM client; this wraps its agent/embedding builders
//! behind the narrow traits the rest of the crate depends on.

use async_trait::async_trait;
use rig::client::{CompletionClient, EmbeddingsClient, ProviderClient};
use rig::completion::Prompt;
use rig::embeddings::EmbeddingModel as _;
use rig::providers::{anthropic, openai};

use crate::config::LlmConfig;
use crate::error::{AppError, Result};

use super::{ChatProvider, EmbeddingProvider};

enum Chat {
    Anthropic(rig::agent::Agent<anthropic::completion::CompletionModel>),
    OpenAi(rig::agent::Agent<openai::CompletionModel>),
}

pub struct RigChatProvider {
    chat: Chat,
    embedding_dimensions: usize,
    embed: Embed,
}

enum Embed {
    OpenAi(openai::EmbeddingModel),
    /// No embedding-capable provider configured; callers fall back to a
    /// zero vector, matching `original_source`'s `add_document` failure path.
    Unavailable,
}

impl RigChatProvider {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::validation("llm.api_key is required"))?;

        let chat = match config.provider.as_str() {
            "anthropic" => {
                let client = anthropic::Client::new(secrecy::ExposeSecret::expose_secret(api_key));
                Chat::Anthropic(client.agent(&config.chat_model).build())
            }
            "openai" => {
                let client = openai::Client::new(secrecy::ExposeSecret::expose_secret(api_key));
                Chat::OpenAi(client.agent(&config.chat_model).build())
            }
            other => {
                return Err(AppError::validation(format!(
                    "unsupported llm.provider '{other}', expected 'anthropic' or 'openai'"
                )))
            }
        };

        let embed = if config.provider == "openai" {
            let client = openai::Client::new(secrecy::ExposeSecret::expose_secret(api_key));
            Embed::OpenAi(client.embedding_model(&config.embedding_model))
        } else {
            Embed::Unavailable
        };

        Ok(Self { chat, embedding_dimensions: 1536, embed })
    }
}

#[async_trait]
impl ChatProvider for RigChatProvider {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let prompt = format!("{system_prompt}\n\n{user_prompt}");
        let response = match &self.chat {
            Chat::Anthropic(agent) => agent.prompt(prompt.as_str()).await,
            Chat::OpenAi(agent) => agent.prompt(prompt.as_str()).await,
        };
        response.map_err(|e| AppError::dependency("llm_chat", anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl EmbeddingProvider for RigChatProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match &self.embed {
            Embed::OpenAi(model) => {
                let embedding = model
                    .embed_text(text)
                    .await
                    .map_err(|e| AppError::dependency("llm_embedding", anyhow::anyhow!(e)))?;
                Ok(embedding.vec.into_iter().map(|v| v as f32).collect())
            }
            Embed::Unavailable => Err(AppError::dependency(
                "llm_embedding",
                anyhow::anyhow!("no embedding-capable provider configured"),
            )),
        }
    }

    fn dimensions(&self) -> usize {
        self.embedding_dimensions
    }
}
