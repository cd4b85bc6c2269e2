//! The ticket enrichment pipeline: the seven-step coordinator that turns a
//! freshly submitted ticket into a classified, scored, routed one.
//!
//! Ported from `original_source/src/workers/tasks.py`'s
//! `process_ticket_task` (language -> classification -> sentiment ->
//! priority -> routing -> suggestions -> finalize), with the Celery
//! task/worker split replaced by an in-process bounded `tokio::sync::mpsc`
//! queue (see `worker_pool`) -- there's no broker in this design, so
//! "enqueue a job" just means "hand it to a worker task over a channel",
//! the same non-aborting, per-step-failure-tolerant semantics as the
//! source's `process()` coroutine.

mod worker_pool;

pub use worker_pool::WorkerPool;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::classifier::Classifier;
use crate::domain::{Ticket, TicketStatus};
use crate::error::{AppError, Result};
use crate::kb::KnowledgeBase;
use crate::priority::PriorityScorer;
use crate::repository::{AgentRepository, RuleRepository, TicketRepository};
use crate::router::{RouteInput, TicketRouter};
use crate::sentiment::SentimentAnalyzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Processed,
    Queued,
    Failed,
}

pub struct ProcessOutcome {
    pub ticket_id: Uuid,
    pub status: ProcessStatus,
    pub processing_time_ms: u64,
    pub error: Option<String>,
}

pub struct Pipeline {
    classifier: Arc<Classifier>,
    sentiment: Arc<SentimentAnalyzer>,
    priority: Arc<PriorityScorer>,
    router: Arc<TicketRouter>,
    kb: Option<Arc<KnowledgeBase>>,
    tickets: Arc<dyn TicketRepository>,
    agents: Arc<dyn AgentRepository>,
    rules: Arc<dyn RuleRepository>,
    deadline: Duration,
    assignment_retry_attempts: u32,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: Arc<Classifier>,
        sentiment: Arc<SentimentAnalyzer>,
        priority: Arc<PriorityScorer>,
        router: Arc<TicketRouter>,
        kb: Option<Arc<KnowledgeBase>>,
        tickets: Arc<dyn TicketRepository>,
        agents: Arc<dyn AgentRepository>,
        rules: Arc<dyn RuleRepository>,
        deadline: Duration,
        assignment_retry_attempts: u32,
    ) -> Self {
        Self { classifier, sentiment, priority, router, kb, tickets, agents, rules, deadline, assignment_retry_attempts }
    }

    /// Runs the pipeline to completion and returns the final outcome.
    /// This is the "sync" mode of spec.md §4.7.
    pub async fn process_sync(&self, ticket_id: Uuid, skip_routing: bool) -> Result<ProcessOutcome> {
        let start = tokio::time::Instant::now();

        let result = tokio::select! {
            result = self.run_steps(ticket_id, skip_routing) => result,
            _ = tokio::time::sleep(self.deadline) => Err(AppError::Cancelled),
        };

        let processing_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => Ok(ProcessOutcome { ticket_id, status: ProcessStatus::Processed, processing_time_ms, error: None }),
            Err(err) => {
                self.record_processing_error(ticket_id, &err.to_string()).await;
                Ok(ProcessOutcome { ticket_id, status: ProcessStatus::Failed, processing_time_ms, error: Some(err.to_string()) })
            }
        }
    }

    /// Steps 1-7 of spec.md §4.7. Idempotent: a ticket already carrying an
    /// assignment skips step 5 entirely, so retrying a partially processed
    /// ticket never double-increments `agent.current_load`.
    async fn run_steps(&self, ticket_id: Uuid, skip_routing: bool) -> Result<()> {
        let mut ticket = self.tickets.get(ticket_id).await?;

        if ticket.is_processed {
            return Ok(());
        }

        // Step 1: language detection, only if the caller didn't supply one.
        if ticket.language.is_empty() {
            let (language, confidence) = crate::text::detect_language(&ticket.content);
            ticket.language = language;
            ticket.language_confidence = Some(confidence);
        }

        // Step 2: classification.
        let classification = self.classifier.classify(&ticket.content, &ticket.language, true).await;
        ticket.category = Some(classification.primary_category.clone());
        ticket.category_confidence = Some(classification.confidence);
        ticket.classification_reasoning = Some(classification.reasoning.clone());
        ticket.secondary_categories =
            classification.secondary_categories.iter().map(|c| (c.clone(), classification.confidence)).collect();

        // Step 3: sentiment.
        let sentiment = self.sentiment.analyze(&ticket.content, &ticket.language).await;
        ticket.sentiment = Some(match sentiment.sentiment {
            crate::sentiment::Sentiment::Positive => crate::domain::TicketSentiment::Positive,
            crate::sentiment::Sentiment::Neutral => crate::domain::TicketSentiment::Neutral,
            crate::sentiment::Sentiment::Negative => crate::domain::TicketSentiment::Negative,
            crate::sentiment::Sentiment::Angry => crate::domain::TicketSentiment::Angry,
        });
        ticket.sentiment_score = Some(sentiment.score);

        // Step 4: priority. `metadata["category"]` is how a category's
        // `priority_boost` reaches the scorer -- see the `CustomPriorityRule`
        // the category's boost is registered under when the scorer is built.
        let tier = ticket.customer_tier.clone().unwrap_or_else(|| "standard".to_string());
        let mut metadata = std::collections::HashMap::new();
        if let Some(category) = &ticket.category {
            metadata.insert("category".to_string(), category.clone());
        }
        let priority = self.priority.calculate(
            &ticket.content,
            Some(sentiment.sentiment),
            Some(sentiment.anger_level),
            &tier,
            ticket.category.as_deref(),
            &metadata,
        );
        ticket.priority = priority.score;
        ticket.priority_factors = priority.factors;

        // Persist the enrichment so far before routing, so a crash between
        // here and step 7 still leaves useful fields on the ticket.
        ticket = self.tickets.update(ticket).await?;

        // Step 5: routing + transactional assignment commit.
        if !skip_routing {
            if let Err(err) = self.route_and_commit(&mut ticket).await {
                ticket.processing_error = Some(format!("routing: {err}"));
            }
        }

        // Step 6: suggested responses -- non-fatal.
        if let Some(kb) = &self.kb {
            match kb.generate_suggested_responses(&ticket.content, ticket.category.as_deref(), &ticket.language, 3).await {
                Ok(suggestions) => ticket.suggested_responses = suggestions,
                Err(err) => tracing::warn!(error = %err, ticket_id = %ticket_id, "suggested responses failed"),
            }
        }

        // Step 7: finalize.
        ticket.is_processed = true;
        if ticket.status == TicketStatus::New {
            ticket.status = TicketStatus::Open;
        }
        self.tickets.update(ticket).await?;

        Ok(())
    }

    async fn route_and_commit(&self, ticket: &mut Ticket) -> Result<()> {
        let rules = self.rules.list_active().await.unwrap_or_default();
        let mut excluded: Vec<Uuid> = Vec::new();

        for attempt in 0..self.assignment_retry_attempts.max(1) {
            let candidates = self
                .agents
                .find_available(
                    ticket.category.as_deref(),
                    Some(&ticket.language),
                    ticket.customer_tier.as_deref().is_some_and(|t| t == "vip" || t == "enterprise"),
                    ticket.priority == 5,
                )
                .await?;
            let candidates: Vec<_> = candidates.into_iter().filter(|a| !excluded.contains(&a.id)).collect();

            if candidates.is_empty() {
                ticket.assignment.reason = Some("no_available_agents".to_string());
                return Ok(());
            }

            let input = RouteInput {
                category: ticket.category.as_deref(),
                priority: ticket.priority,
                language: &ticket.language,
                customer_tier: ticket.customer_tier.as_deref().unwrap_or("standard"),
                source: Some(&ticket.source),
                content: &ticket.content,
                subject: ticket.subject.as_deref().unwrap_or(""),
                sentiment: ticket.sentiment.map(sentiment_label),
            };

            let decision = self.router.route(&input, &candidates, &rules);

            let Some(agent_id) = decision.agent_id else {
                ticket.assignment.reason =
                    decision.message.clone().or_else(|| Some("no_available_agents".to_string()));
                ticket.assignment.escalated = decision.reason == crate::router::RoutingReason::Escalation;
                if ticket.assignment.escalated {
                    ticket.bump_priority_for_escalation();
                }
                ticket.assignment.escalation_reason = decision.escalation_reason.clone();
                return Ok(());
            };

            let reason = decision.rule_name.clone().unwrap_or_else(|| format!("{:?}", decision.reason));
            match self.agents.commit_assignment(ticket.id, agent_id, &reason, decision.confidence).await {
                Ok(true) => {
                    ticket.assignment.agent_id = Some(agent_id);
                    ticket.assignment.reason = Some(reason);
                    ticket.assignment.confidence = Some(decision.confidence);
                    ticket.status = TicketStatus::Open;
                    return Ok(());
                }
                Ok(false) => {
                    tracing::debug!(ticket_id = %ticket.id, agent_id = %agent_id, attempt, "assignment capacity race, retrying");
                    excluded.push(agent_id);
                    continue;
                }
                Err(err) => return Err(err),
            }
        }

        ticket.assignment.reason = Some("no_available_agents".to_string());
        Err(AppError::conflict("assignment capacity race exhausted retries"))
    }

    async fn record_processing_error(&self, ticket_id: Uuid, message: &str) {
        if let Ok(mut ticket) = self.tickets.get(ticket_id).await {
            ticket.processing_error = Some(message.to_string());
            let _ = self.tickets.update(ticket).await;
        }
    }
}

fn sentiment_label(sentiment: crate::domain::TicketSentiment) -> &'static str {
    match sentiment {
        crate::domain::TicketSentiment::Positive => "positive",
        crate::domain::TicketSentiment::Neutral => "neutral",
        crate::domain::TicketSentiment::Negative => "negative",
        crate::domain::TicketSentiment::Angry => "angry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ClassifierCache;
    use crate::domain::{Agent, AgentRole, AgentStatus, WorkingHours};
    use crate::repository::memory::{InMemoryAgentRepository, InMemoryRuleRepository, InMemoryTicketRepository};
    use std::collections::HashMap;

    fn pipeline(tickets: Arc<InMemoryTicketRepository>, agents: Arc<InMemoryAgentRepository>) -> Pipeline {
        let cache = ClassifierCache::new(3600, 1000);
        Pipeline::new(
            Arc::new(Classifier::new(crate::classifier::DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(), Some(cache), None)),
            Arc::new(SentimentAnalyzer::new(None)),
            Arc::new(PriorityScorer::new(Vec::new())),
            Arc::new(TicketRouter::new()),
            None,
            tickets,
            agents,
            Arc::new(InMemoryRuleRepository::seeded()),
            Duration::from_secs(5),
            3,
        )
    }

    fn online_agent(name: &str, skills: &[&str]) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            external_id: None,
            email: format!("{name}@example.com"),
            name: name.to_string(),
            role: AgentRole::Agent,
            team: Some("technical_support".to_string()),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            languages: vec!["en".to_string()],
            experience_level: 3,
            specializations: HashMap::new(),
            current_load: 0,
            max_load: 5,
            daily_capacity: 20,
            tickets_handled_today: 0,
            tickets_resolved_today: 0,
            status: AgentStatus::Online,
            is_active: true,
            last_active_at: None,
            working_hours: WorkingHours { working_days: (0..7).collect(), start: "00:00".to_string(), end: "23:59".to_string(), ..WorkingHours::default() },
            avg_resolution_time_seconds: None,
            avg_first_response_time_seconds: None,
            customer_satisfaction_score: None,
            quality_score: None,
            total_tickets_resolved: 0,
            tickets_escalated: 0,
            can_handle_critical: false,
            can_handle_vip: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn processes_a_ticket_end_to_end_and_assigns_an_agent() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(Arc::clone(&tickets)));
        agents.create(online_agent("alice", &["technical_issue", "bug_report"])).await.unwrap();

        let mut ticket = Ticket::new("My app keeps crashing, please help urgently", "email");
        ticket.language = "en".to_string();
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let pipeline = pipeline(tickets.clone(), agents.clone());
        let outcome = pipeline.process_sync(ticket_id, false).await.unwrap();

        assert_eq!(outcome.status, ProcessStatus::Processed);
        let processed = tickets.get(ticket_id).await.unwrap();
        assert!(processed.is_processed);
        assert!(processed.assignment.agent_id.is_some());
        assert_eq!(processed.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn reprocessing_an_already_processed_ticket_does_not_double_increment_load() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(Arc::clone(&tickets)));
        let agent = online_agent("bob", &["general_inquiry"]);
        let agent_id = agent.id;
        agents.create(agent).await.unwrap();

        let mut ticket = Ticket::new("just a question", "email");
        ticket.language = "en".to_string();
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let pipeline = pipeline(tickets.clone(), agents.clone());
        pipeline.process_sync(ticket_id, false).await.unwrap();
        let load_after_first = agents.get(agent_id).await.unwrap().current_load;

        pipeline.process_sync(ticket_id, false).await.unwrap();
        let load_after_second = agents.get(agent_id).await.unwrap().current_load;

        assert_eq!(load_after_first, load_after_second);
    }

    #[tokio::test]
    async fn no_available_agents_leaves_ticket_unassigned_but_processed() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = Arc::new(InMemoryAgentRepository::new(Arc::clone(&tickets)));

        let mut ticket = Ticket::new("anything at all", "email");
        ticket.language = "en".to_string();
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let pipeline = pipeline(tickets.clone(), agents.clone());
        let outcome = pipeline.process_sync(ticket_id, false).await.unwrap();

        assert_eq!(outcome.status, ProcessStatus::Processed);
        let processed = tickets.get(ticket_id).await.unwrap();
        assert!(processed.is_processed);
        assert!(processed.assignment.agent_id.is_none());
        assert_eq!(processed.assignment.reason.as_deref(), Some("no_available_agents"));
    }
}
