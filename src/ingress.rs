//! `TicketService`: the abstract entry-point surface of spec.md §6 --
//! submit/get/update/reassign/escalate/resolve/delete/list tickets, agent
//! CRUD, category/rule upsert and knowledge-base operations. No HTTP
//! framework sits in front of this; input validation lives here, the way
//! `original_source/src/utils/validation.py`'s helpers are called at the
//! very top of each `original_source/src/api/routes/*.py` handler before
//! anything touches the database.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Agent, AgentStatus, Category, Customer, CustomerTier, RoutingRule, Ticket, TicketStatus};
use crate::error::{AppError, Result};
use crate::kb::KnowledgeBase;
use crate::pipeline::{Pipeline, WorkerPool};
use crate::repository::{
    AgentRepository, CategoryRepository, CustomerRepository, Page, Pagination, RuleRepository, SortOrder,
    TicketFilter, TicketRepository,
};

/// The 13 language codes the source's `validate_language_code` allowlists.
const SUPPORTED_LANGUAGES: &[&str] =
    &["tr", "en", "de", "fr", "es", "it", "pt", "nl", "ru", "ar", "zh", "ja", "ko"];

pub struct SubmitTicketRequest {
    pub content: String,
    pub subject: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_tier: Option<String>,
    pub external_id: Option<String>,
    pub external_system: Option<String>,
    pub source: String,
    pub channel: Option<String>,
    pub language: Option<String>,
    pub tags: Vec<String>,
    pub process_async: bool,
    pub skip_routing: bool,
}

impl Default for SubmitTicketRequest {
    fn default() -> Self {
        Self {
            content: String::new(),
            subject: None,
            customer_email: None,
            customer_name: None,
            customer_tier: None,
            external_id: None,
            external_system: None,
            source: "api".to_string(),
            channel: None,
            language: None,
            tags: Vec::new(),
            process_async: true,
            skip_routing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Processed,
    Queued,
    Failed,
}

pub struct SubmitTicketResponse {
    pub ticket_id: Uuid,
    pub status: SubmitStatus,
    pub processing_time_ms: Option<u64>,
    pub error: Option<String>,
}

pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    rules: Arc<dyn RuleRepository>,
    categories: Arc<dyn CategoryRepository>,
    customers: Arc<dyn CustomerRepository>,
    kb: Option<Arc<KnowledgeBase>>,
    pipeline: Arc<Pipeline>,
    worker_pool: WorkerPool,
}

impl TicketService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        rules: Arc<dyn RuleRepository>,
        categories: Arc<dyn CategoryRepository>,
        customers: Arc<dyn CustomerRepository>,
        kb: Option<Arc<KnowledgeBase>>,
        pipeline: Arc<Pipeline>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Self {
        let worker_pool = WorkerPool::spawn(Arc::clone(&pipeline), worker_count, queue_capacity);
        Self { tickets, agents, rules, categories, customers, kb, pipeline, worker_pool }
    }

    pub async fn shutdown(self) {
        self.worker_pool.shutdown().await;
    }

    pub async fn submit_ticket(&self, req: SubmitTicketRequest) -> Result<SubmitTicketResponse> {
        validate_content(&req.content)?;
        if let Some(language) = &req.language {
            validate_language(language)?;
        }
        if let Some(email) = &req.customer_email {
            validate_email(email)?;
        }

        let customer_id = self.resolve_customer(&req).await?;

        let mut ticket = Ticket::new(req.content, req.source);
        ticket.subject = req.subject;
        ticket.customer_id = customer_id;
        ticket.customer_email = req.customer_email;
        ticket.customer_name = req.customer_name;
        ticket.customer_tier = Some(req.customer_tier.unwrap_or_else(|| "standard".to_string()));
        ticket.external_id = req.external_id;
        ticket.external_system = req.external_system;
        ticket.channel = req.channel;
        ticket.tags = req.tags;
        if let Some(language) = req.language {
            ticket.language = language;
        }

        let ticket = self.tickets.create(ticket).await?;
        let ticket_id = ticket.id;

        if req.process_async {
            self.worker_pool
                .submit(ticket_id, req.skip_routing)
                .await
                .map_err(|id| AppError::dependency("pipeline_queue", anyhow::anyhow!("queue full, dropped ticket {id}")))?;
            return Ok(SubmitTicketResponse { ticket_id, status: SubmitStatus::Queued, processing_time_ms: None, error: None });
        }

        let outcome = self.pipeline.process_sync(ticket_id, req.skip_routing).await?;
        let status = match outcome.status {
            crate::pipeline::ProcessStatus::Processed => SubmitStatus::Processed,
            crate::pipeline::ProcessStatus::Queued => SubmitStatus::Queued,
            crate::pipeline::ProcessStatus::Failed => SubmitStatus::Failed,
        };
        Ok(SubmitTicketResponse { ticket_id, status, processing_time_ms: Some(outcome.processing_time_ms), error: outcome.error })
    }

    async fn resolve_customer(&self, req: &SubmitTicketRequest) -> Result<Option<Uuid>> {
        let Some(email) = &req.customer_email else { return Ok(None) };
        if let Some(existing) = self.customers.find_by_email(email).await? {
            return Ok(Some(existing.id));
        }
        let tier = req
            .customer_tier
            .as_deref()
            .and_then(|t| customer_tier_from_str(t))
            .unwrap_or(CustomerTier::Standard);
        let customer = Customer {
            id: Uuid::new_v4(),
            external_id: None,
            email: email.clone(),
            name: req.customer_name.clone(),
            tier,
            is_active: true,
            preferred_language: req.language.clone().unwrap_or_else(|| "en".to_string()),
            total_tickets: 0,
            avg_satisfaction: None,
        };
        let customer = self.customers.upsert(customer).await?;
        Ok(Some(customer.id))
    }

    pub async fn get_ticket(&self, id: Uuid) -> Result<Ticket> {
        self.tickets.get(id).await
    }

    pub async fn update_ticket(&self, mut ticket: Ticket, subject: Option<String>, tags: Option<Vec<String>>) -> Result<Ticket> {
        if let Some(subject) = subject {
            ticket.subject = Some(subject);
        }
        if let Some(tags) = tags {
            ticket.tags = tags;
        }
        self.tickets.update(ticket).await
    }

    /// Re-routes a ticket, excluding its currently assigned agent (if any)
    /// from the candidate pool, and commits the new assignment the same
    /// way the pipeline's step 5 does.
    pub async fn reassign_ticket(&self, id: Uuid) -> Result<Ticket> {
        let mut ticket = self.tickets.get(id).await?;
        let previous_agent = ticket.assignment.agent_id;

        let rules = self.rules.list_active().await.unwrap_or_default();
        let candidates = self
            .agents
            .find_available(
                ticket.category.as_deref(),
                Some(&ticket.language),
                ticket.customer_tier.as_deref().is_some_and(|t| t == "vip" || t == "enterprise"),
                ticket.priority == 5,
            )
            .await?;

        let router = crate::router::TicketRouter::new();
        let input = crate::router::RouteInput {
            category: ticket.category.as_deref(),
            priority: ticket.priority,
            language: &ticket.language,
            customer_tier: ticket.customer_tier.as_deref().unwrap_or("standard"),
            source: Some(&ticket.source),
            content: &ticket.content,
            subject: ticket.subject.as_deref().unwrap_or(""),
            sentiment: None,
        };
        let exclude: Vec<Uuid> = previous_agent.into_iter().collect();
        let decision = router.reassign(&input, &candidates, &rules, &exclude);

        let Some(agent_id) = decision.agent_id else {
            ticket.assignment.reason = Some("no_available_agents".to_string());
            return self.tickets.update(ticket).await;
        };

        let reason = decision.rule_name.clone().unwrap_or_else(|| format!("{:?}", decision.reason));
        if self.agents.commit_assignment(ticket.id, agent_id, &reason, decision.confidence).await? {
            if let Some(previous) = previous_agent {
                self.agents.release(previous).await?;
            }
            ticket.assignment.previous_agent_id = previous_agent;
            ticket.assignment.agent_id = Some(agent_id);
            ticket.assignment.reason = Some(reason);
            ticket.assignment.confidence = Some(decision.confidence);
        }

        self.tickets.update(ticket).await
    }

    pub async fn escalate_ticket(&self, id: Uuid, reason: impl Into<String>) -> Result<Ticket> {
        let mut ticket = self.tickets.get(id).await?;
        ticket.status = TicketStatus::Escalated;
        ticket.bump_priority_for_escalation();
        ticket.assignment.escalated = true;
        ticket.assignment.escalation_reason = Some(reason.into());
        self.tickets.update(ticket).await
    }

    pub async fn resolve_ticket(&self, id: Uuid) -> Result<Ticket> {
        let mut ticket = self.tickets.get(id).await?;
        ticket.status = TicketStatus::Resolved;
        ticket.resolved_at = Some(chrono::Utc::now());
        if let Some(agent_id) = ticket.assignment.agent_id {
            self.agents.release(agent_id).await?;
        }
        self.tickets.update(ticket).await
    }

    pub async fn delete_ticket(&self, id: Uuid) -> Result<()> {
        self.tickets.delete(id).await
    }

    pub async fn list_tickets(&self, filter: TicketFilter, pagination: Pagination, sort: SortOrder) -> Result<Page<Ticket>> {
        self.tickets.list(&filter, pagination, sort).await
    }

    pub async fn create_agent(&self, agent: Agent) -> Result<Agent> {
        self.agents.create(agent).await
    }

    pub async fn update_agent(&self, agent: Agent) -> Result<Agent> {
        self.agents.update(agent).await
    }

    pub async fn set_agent_status(&self, id: Uuid, status: AgentStatus) -> Result<()> {
        self.agents.set_status(id, status).await
    }

    pub async fn delete_agent(&self, id: Uuid) -> Result<()> {
        self.agents.deactivate(id).await
    }

    pub async fn get_available_agents(&self, category: Option<&str>, language: Option<&str>) -> Result<Vec<Agent>> {
        self.agents.find_available(category, language, false, false).await
    }

    pub async fn upsert_category(&self, category: Category) -> Result<Category> {
        self.categories.upsert(category).await
    }

    pub async fn upsert_routing_rule(&self, rule: RoutingRule) -> Result<RoutingRule> {
        self.rules.upsert(rule).await
    }

    pub async fn kb_add_document(&self, text: String, category: Option<String>) -> Result<Uuid> {
        let kb = self.kb.as_ref().ok_or_else(|| AppError::validation("knowledge base is not configured"))?;
        kb.add_document(crate::domain::KbDocumentKind::Document, text, category, None, None).await
    }

    pub async fn kb_add_faq(&self, question: String, answer: String, category: Option<String>) -> Result<Uuid> {
        let kb = self.kb.as_ref().ok_or_else(|| AppError::validation("knowledge base is not configured"))?;
        kb.add_faq(question, answer, category).await
    }

    pub async fn kb_stats(&self) -> Result<usize> {
        let kb = self.kb.as_ref().ok_or_else(|| AppError::validation("knowledge base is not configured"))?;
        kb.document_count().await
    }
}

fn customer_tier_from_str(value: &str) -> Option<CustomerTier> {
    match value {
        "free" => Some(CustomerTier::Free),
        "standard" => Some(CustomerTier::Standard),
        "premium" => Some(CustomerTier::Premium),
        "vip" => Some(CustomerTier::Vip),
        "enterprise" => Some(CustomerTier::Enterprise),
        _ => None,
    }
}

fn validate_content(content: &str) -> Result<()> {
    let len = content.chars().count();
    if len == 0 || len > 50_000 {
        return Err(AppError::validation("content must be between 1 and 50000 characters"));
    }
    Ok(())
}

fn validate_language(language: &str) -> Result<()> {
    if !SUPPORTED_LANGUAGES.contains(&language) {
        return Err(AppError::validation(format!("unsupported language code '{language}'")));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.contains('@')
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'));
    if !valid {
        return Err(AppError::validation(format!("invalid email address '{email}'")));
    }
    Ok(())
}

pub fn validate_priority(priority: u8) -> Result<()> {
    if !(1..=5).contains(&priority) {
        return Err(AppError::validation("priority must be between 1 and 5"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ClassifierCache;
    use crate::classifier::Classifier;
    use crate::priority::PriorityScorer;
    use crate::repository::memory::{
        InMemoryAgentRepository, InMemoryCategoryRepository, InMemoryCustomerRepository, InMemoryRuleRepository,
        InMemoryTicketRepository,
    };
    use crate::router::TicketRouter;
    use crate::sentiment::SentimentAnalyzer;
    use std::time::Duration;

    fn service() -> TicketService {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(tickets.clone()));
        let rules = Arc::new(InMemoryRuleRepository::seeded());
        let categories = Arc::new(InMemoryCategoryRepository::seeded());
        let customers = Arc::new(InMemoryCustomerRepository::new());

        let cache = ClassifierCache::new(3600, 1000);
        let pipeline = Arc::new(Pipeline::new(
            Arc::new(Classifier::new(crate::classifier::DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(), Some(cache), None)),
            Arc::new(SentimentAnalyzer::new(None)),
            Arc::new(PriorityScorer::new(Vec::new())),
            Arc::new(TicketRouter::new()),
            None,
            tickets.clone(),
            agents.clone(),
            rules.clone(),
            Duration::from_secs(5),
            3,
        ));

        TicketService::new(tickets, agents, rules, categories, customers, None, pipeline, 2, 16)
    }

    #[tokio::test]
    async fn rejects_empty_content() {
        let service = service();
        let req = SubmitTicketRequest { content: String::new(), ..Default::default() };
        let err = service.submit_ticket(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_unsupported_language() {
        let service = service();
        let req = SubmitTicketRequest { content: "hello".to_string(), language: Some("xx".to_string()), ..Default::default() };
        let err = service.submit_ticket(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn submits_and_processes_ticket_synchronously() {
        let service = service();
        let req = SubmitTicketRequest { content: "I need a refund on my last invoice".to_string(), process_async: false, ..Default::default() };
        let response = service.submit_ticket(req).await.unwrap();
        assert_eq!(response.status, SubmitStatus::Processed);

        let ticket = service.get_ticket(response.ticket_id).await.unwrap();
        assert!(ticket.is_processed);
    }

    #[tokio::test]
    async fn submitting_with_customer_email_creates_a_customer_record() {
        let service = service();
        let req = SubmitTicketRequest {
            content: "where is my order".to_string(),
            customer_email: Some("jane@example.com".to_string()),
            process_async: false,
            ..Default::default()
        };
        let response = service.submit_ticket(req).await.unwrap();
        let ticket = service.get_ticket(response.ticket_id).await.unwrap();
        assert!(ticket.customer_id.is_some());
    }
}
