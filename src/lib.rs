//! TicketFlow: ticket classification, sentiment and priority scoring, and
//! skill/load-aware agent routing, with a pipeline coordinator tying the
//! stages together and a thin ingress layer in front of it.
//!
//! `ServiceContainer` is the composition root: it reads a [`Config`] and
//! wires concrete repositories, providers and services together, mirroring
//! the "one place builds everything, everything else takes what it needs
//! by constructor argument" shape used throughout this codebase's own
//! modules.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingress;
pub mod kb;
pub mod llm;
pub mod pipeline;
pub mod priority;
pub mod repository;
pub mod router;
pub mod scheduler;
pub mod sentiment;
pub mod text;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::Result;
use crate::ingress::TicketService;
use crate::kb::KnowledgeBase;
use crate::llm::{ChatProvider, EmbeddingProvider, RigChatProvider};
use crate::pipeline::Pipeline;
use crate::priority::{CustomPriorityRule, PriorityScorer};
use crate::repository::{AgentRepository, CategoryRepository, CustomerRepository, RuleRepository, TicketRepository};
use crate::router::TicketRouter;
use crate::scheduler::Scheduler;
use crate::sentiment::SentimentAnalyzer;

/// Everything the process needs at runtime, built once from [`Config`].
pub struct ServiceContainer {
    pub tickets: TicketService,
    scheduler_handles: Vec<tokio::task::JoinHandle<()>>,
    scheduler_cancel: CancellationToken,
}

impl ServiceContainer {
    pub async fn build(config: &Config) -> Result<Self> {
        let (ticket_repo, agent_repo, rule_repo, category_repo, customer_repo, vector_store) =
            build_repositories(config).await?;

        let categories = category_repo.list_active().await.unwrap_or_default();
        let category_names: Vec<String> = if categories.is_empty() {
            crate::classifier::DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
        } else {
            categories.iter().map(|c| c.name.clone()).collect()
        };
        let custom_priority_rules: Vec<CustomPriorityRule> = categories
            .iter()
            .filter(|c| c.priority_boost != 0)
            .map(|c| CustomPriorityRule::CustomerField {
                name: format!("category_priority_boost_{}", c.name),
                field: "category".to_string(),
                value: c.name.clone(),
                weight: c.priority_boost,
                description: format!("Category '{}' priority boost", c.name),
            })
            .collect();

        // Each consumer gets its own provider instance rather than sharing
        // one behind an `Arc` -- `RigChatProvider::from_config` only builds
        // lightweight client handles, and the `ChatProvider`/`EmbeddingProvider`
        // consumers all take ownership of a `Box<dyn Trait>`.
        let classifier = Arc::new(Classifier::new(
            category_names,
            Some(crate::cache::ClassifierCache::new(config.cache.classifier_ttl_secs, config.cache.classifier_max_entries)),
            build_chat_provider(config),
        ));
        let sentiment = Arc::new(SentimentAnalyzer::new(build_chat_provider(config)));
        let priority = Arc::new(PriorityScorer::new(custom_priority_rules));
        let router = Arc::new(TicketRouter::new());

        let kb = vector_store.map(|store| Arc::new(KnowledgeBase::new(store, build_embedding_provider(config), build_chat_provider(config))));

        let pipeline = Arc::new(Pipeline::new(
            Arc::clone(&classifier),
            Arc::clone(&sentiment),
            Arc::clone(&priority),
            Arc::clone(&router),
            kb.clone(),
            Arc::clone(&ticket_repo),
            Arc::clone(&agent_repo),
            Arc::clone(&rule_repo),
            Duration::from_secs(config.pipeline.ticket_deadline_secs),
            config.pipeline.assignment_retry_attempts,
        ));

        let tickets = TicketService::new(
            Arc::clone(&ticket_repo),
            Arc::clone(&agent_repo),
            Arc::clone(&rule_repo),
            category_repo,
            customer_repo,
            kb,
            pipeline,
            config.pipeline.worker_count,
            config.pipeline.queue_capacity,
        );

        let scheduler = Arc::new(Scheduler::new(
            ticket_repo,
            agent_repo,
            config.scheduler.sla_scan_cron.clone(),
            config.scheduler.daily_reset_cron.clone(),
        ));
        let scheduler_cancel = CancellationToken::new();
        let scheduler_handles = scheduler.spawn(scheduler_cancel.clone());

        Ok(Self { tickets, scheduler_handles, scheduler_cancel })
    }

    /// Stops the background scheduler loops and the pipeline's worker pool.
    pub async fn shutdown(self) {
        self.scheduler_cancel.cancel();
        for handle in self.scheduler_handles {
            let _ = handle.await;
        }
        self.tickets.shutdown().await;
    }
}

#[allow(clippy::type_complexity)]
async fn build_repositories(
    config: &Config,
) -> Result<(
    Arc<dyn TicketRepository>,
    Arc<dyn AgentRepository>,
    Arc<dyn RuleRepository>,
    Arc<dyn CategoryRepository>,
    Arc<dyn CustomerRepository>,
    Option<Arc<dyn crate::kb::VectorStore>>,
)> {
    #[cfg(feature = "postgres")]
    {
        if let Ok(pool) = build_pg_pool(config) {
            let tickets: Arc<dyn TicketRepository> = Arc::new(crate::repository::postgres::PgTicketRepository::new(pool.clone()));
            let agents: Arc<dyn AgentRepository> = Arc::new(crate::repository::postgres::PgAgentRepository::new(pool.clone()));
            let rules: Arc<dyn RuleRepository> = Arc::new(crate::repository::postgres::PgRuleRepository::new(pool.clone()));
            let categories: Arc<dyn CategoryRepository> = Arc::new(crate::repository::postgres::PgCategoryRepository::new(pool.clone()));
            let customers: Arc<dyn CustomerRepository> = Arc::new(crate::repository::postgres::PgCustomerRepository::new(pool.clone()));
            let vector_store: Arc<dyn crate::kb::VectorStore> = Arc::new(crate::kb::PgVectorStore::new(pool));
            return Ok((tickets, agents, rules, categories, customers, Some(vector_store)));
        }
        tracing::warn!("failed to connect to postgres, falling back to in-memory repositories");
    }

    let tickets = Arc::new(crate::repository::memory::InMemoryTicketRepository::new());
    let agents: Arc<dyn AgentRepository> = Arc::new(crate::repository::memory::InMemoryAgentRepository::new(Arc::clone(&tickets)));
    let rules: Arc<dyn RuleRepository> = Arc::new(crate::repository::memory::InMemoryRuleRepository::seeded());
    let categories: Arc<dyn CategoryRepository> = Arc::new(crate::repository::memory::InMemoryCategoryRepository::seeded());
    let customers: Arc<dyn CustomerRepository> = Arc::new(crate::repository::memory::InMemoryCustomerRepository::new());
    let vector_store: Arc<dyn crate::kb::VectorStore> = Arc::new(crate::kb::InMemoryVectorStore::new());
    let tickets: Arc<dyn TicketRepository> = tickets;

    Ok((tickets, agents, rules, categories, customers, Some(vector_store)))
}

#[cfg(feature = "postgres")]
fn build_pg_pool(config: &Config) -> Result<deadpool_postgres::Pool> {
    let mut pg_config = deadpool_postgres::Config::new();
    pg_config.url = Some(config.database.url.clone());
    pg_config.pool = Some(deadpool_postgres::PoolConfig::new(config.database.pool_max_size));
    pg_config
        .create_pool(Some(deadpool_postgres::Runtime::Tokio1), tokio_postgres::NoTls)
        .map_err(|e| crate::error::AppError::dependency("postgres_pool", e))
}

fn build_chat_provider(config: &Config) -> Option<Box<dyn ChatProvider>> {
    if config.llm.api_key.is_none() {
        return None;
    }
    match RigChatProvider::from_config(&config.llm) {
        Ok(provider) => Some(Box::new(provider)),
        Err(err) => {
            tracing::warn!(error = %err, "failed to build LLM chat provider, falling back to rule-based paths");
            None
        }
    }
}

fn build_embedding_provider(config: &Config) -> Option<Box<dyn EmbeddingProvider>> {
    if config.llm.api_key.is_none() {
        return None;
    }
    match RigChatProvider::from_config(&config.llm) {
        Ok(provider) => Some(Box::new(provider)),
        Err(_) => None,
    }
}
