//! In-memory repositories for tests and the demo CLI.
//!
//! Uses `parking_lot::RwLock<HashMap<...>>`, already in the teacher's
//! dependency tree for exactly this "fallback store" role. The
//! assignment commit takes the agents map's write lock for the whole
//! check-and-increment, which is what gives this implementation the same
//! race semantics as the Postgres `SELECT ... FOR UPDATE` path despite
//! having no actual row lock.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::domain::{Agent, AgentStatus, Category, Customer, RoutingRule, Ticket, TicketStatus};
use crate::error::{AppError, Result};

use super::{AgentRepository, CategoryRepository, CustomerRepository, Page, Pagination, RuleRepository, SortOrder, TicketFilter, TicketRepository};

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<Uuid, Ticket>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn create(&self, ticket: Ticket) -> Result<Ticket> {
        self.tickets.write().insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn get(&self, id: Uuid) -> Result<Ticket> {
        self.tickets.read().get(&id).cloned().ok_or_else(|| AppError::not_found_uuid("ticket", id))
    }

    async fn update(&self, ticket: Ticket) -> Result<Ticket> {
        let mut tickets = self.tickets.write();
        if !tickets.contains_key(&ticket.id) {
            return Err(AppError::not_found_uuid("ticket", ticket.id));
        }
        tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tickets.write().remove(&id).ok_or_else(|| AppError::not_found_uuid("ticket", id))?;
        Ok(())
    }

    async fn list(&self, filter: &TicketFilter, pagination: Pagination, sort: SortOrder) -> Result<Page<Ticket>> {
        let tickets = self.tickets.read();
        let mut matched: Vec<Ticket> = tickets
            .values()
            .filter(|t| filter.status.map(|s| s == t.status).unwrap_or(true))
            .filter(|t| filter.category.as_ref().map(|c| t.category.as_deref() == Some(c.as_str())).unwrap_or(true))
            .filter(|t| filter.customer_id.map(|id| t.customer_id == Some(id)).unwrap_or(true))
            .filter(|t| filter.assigned_agent_id.map(|id| t.assignment.agent_id == Some(id)).unwrap_or(true))
            .cloned()
            .collect();

        matched.sort_by(|a, b| match sort {
            SortOrder::Asc => a.created_at.cmp(&b.created_at),
            SortOrder::Desc => b.created_at.cmp(&a.created_at),
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();

        Ok(Page { items, total })
    }

    async fn find_sla_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        Ok(self
            .tickets
            .read()
            .values()
            .filter(|t| !t.sla_breached)
            .filter(|t| matches!(t.status, TicketStatus::New | TicketStatus::Open | TicketStatus::InProgress))
            .filter(|t| t.sla_due_at.is_some_and(|due| due < now))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<Uuid, Agent>>,
    tickets: std::sync::Arc<InMemoryTicketRepository>,
}

impl InMemoryAgentRepository {
    pub fn new(tickets: std::sync::Arc<InMemoryTicketRepository>) -> Self {
        Self { agents: RwLock::new(HashMap::new()), tickets }
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn create(&self, agent: Agent) -> Result<Agent> {
        self.agents.write().insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn get(&self, id: Uuid) -> Result<Agent> {
        self.agents.read().get(&id).cloned().ok_or_else(|| AppError::not_found_uuid("agent", id))
    }

    async fn update(&self, agent: Agent) -> Result<Agent> {
        let mut agents = self.agents.write();
        if !agents.contains_key(&agent.id) {
            return Err(AppError::not_found_uuid("agent", agent.id));
        }
        agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn set_status(&self, id: Uuid, status: AgentStatus) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents.get_mut(&id).ok_or_else(|| AppError::not_found_uuid("agent", id))?;
        agent.status = status;
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents.get_mut(&id).ok_or_else(|| AppError::not_found_uuid("agent", id))?;
        agent.is_active = false;
        agent.status = AgentStatus::Offline;
        Ok(())
    }

    async fn find_available(
        &self,
        category: Option<&str>,
        language: Option<&str>,
        require_vip: bool,
        require_critical: bool,
    ) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .read()
            .values()
            .filter(|a| a.is_active && a.status == AgentStatus::Online && a.current_load < a.max_load)
            .filter(|a| !require_vip || a.can_handle_vip)
            .filter(|a| !require_critical || a.can_handle_critical)
            .filter(|a| category.map(|c| a.can_handle_category(c)).unwrap_or(true))
            .filter(|a| language.map(|l| a.can_handle_language(l)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn reset_daily_counters(&self) -> Result<()> {
        for agent in self.agents.write().values_mut() {
            agent.tickets_handled_today = 0;
            agent.tickets_resolved_today = 0;
        }
        Ok(())
    }

    async fn commit_assignment(&self, ticket_id: Uuid, agent_id: Uuid, reason: &str, confidence: f64) -> Result<bool> {
        let mut agents = self.agents.write();
        let agent = agents.get_mut(&agent_id).ok_or_else(|| AppError::not_found_uuid("agent", agent_id))?;

        if agent.current_load >= agent.max_load {
            return Ok(false);
        }
        agent.current_load += 1;
        agent.tickets_handled_today += 1;

        let mut tickets = self.tickets.tickets.write();
        let ticket = tickets.get_mut(&ticket_id).ok_or_else(|| AppError::not_found_uuid("ticket", ticket_id))?;
        ticket.assignment.previous_agent_id = ticket.assignment.agent_id;
        ticket.assignment.agent_id = Some(agent_id);
        ticket.assignment.reason = Some(reason.to_string());
        ticket.assignment.confidence = Some(confidence);
        ticket.updated_at = Utc::now();

        Ok(true)
    }

    async fn release(&self, agent_id: Uuid) -> Result<()> {
        let mut agents = self.agents.write();
        let agent = agents.get_mut(&agent_id).ok_or_else(|| AppError::not_found_uuid("agent", agent_id))?;
        agent.current_load = agent.current_load.saturating_sub(1);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<HashMap<Uuid, RoutingRule>>,
}

impl InMemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let rules = crate::domain::default_routing_rules().into_iter().map(|r| (r.id, r)).collect();
        Self { rules: RwLock::new(rules) }
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn list_active(&self) -> Result<Vec<RoutingRule>> {
        Ok(self.rules.read().values().filter(|r| r.is_active).cloned().collect())
    }

    async fn upsert(&self, rule: RoutingRule) -> Result<RoutingRule> {
        self.rules.write().insert(rule.id, rule.clone());
        Ok(rule)
    }
}

#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: RwLock<HashMap<String, Category>>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded() -> Self {
        let categories = crate::domain::default_categories().into_iter().map(|c| (c.name.clone(), c)).collect();
        Self { categories: RwLock::new(categories) }
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn list_active(&self) -> Result<Vec<Category>> {
        Ok(self.categories.read().values().filter(|c| c.is_active).cloned().collect())
    }

    async fn upsert(&self, category: Category) -> Result<Category> {
        self.categories.write().insert(category.name.clone(), category.clone());
        Ok(category)
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<Uuid, Customer>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn get(&self, id: Uuid) -> Result<Customer> {
        self.customers.read().get(&id).cloned().ok_or_else(|| AppError::not_found_uuid("customer", id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>> {
        Ok(self.customers.read().values().find(|c| c.email == email).cloned())
    }

    async fn upsert(&self, customer: Customer) -> Result<Customer> {
        self.customers.write().insert(customer.id, customer.clone());
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentRole, WorkingHours};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Arc;

    fn agent(max_load: u32) -> Agent {
        Agent {
            id: Uuid::new_v4(),
            external_id: None,
            email: "a@example.com".to_string(),
            name: "Agent".to_string(),
            role: AgentRole::Agent,
            team: None,
            skills: Vec::new(),
            languages: Vec::new(),
            experience_level: 1,
            specializations: StdHashMap::new(),
            current_load: max_load.saturating_sub(1),
            max_load,
            daily_capacity: 10,
            tickets_handled_today: 0,
            tickets_resolved_today: 0,
            status: AgentStatus::Online,
            is_active: true,
            last_active_at: None,
            working_hours: WorkingHours::default(),
            avg_resolution_time_seconds: None,
            avg_first_response_time_seconds: None,
            customer_satisfaction_score: None,
            quality_score: None,
            total_tickets_resolved: 0,
            tickets_escalated: 0,
            can_handle_critical: false,
            can_handle_vip: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn commit_assignment_fails_gracefully_when_agent_is_at_capacity() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = InMemoryAgentRepository::new(tickets.clone());

        let mut a = agent(1);
        a.current_load = 1;
        let agent_id = a.id;
        agents.create(a).await.unwrap();

        let ticket = Ticket::new("hello", "api");
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let committed = agents.commit_assignment(ticket_id, agent_id, "test", 0.9).await.unwrap();
        assert!(!committed);
    }

    #[tokio::test]
    async fn commit_assignment_increments_load_and_sets_ticket_assignment() {
        let tickets = Arc::new(InMemoryTicketRepository::new());
        let agents = InMemoryAgentRepository::new(tickets.clone());

        let a = agent(5);
        let agent_id = a.id;
        agents.create(a).await.unwrap();

        let ticket = Ticket::new("hello", "api");
        let ticket_id = ticket.id;
        tickets.create(ticket).await.unwrap();

        let committed = agents.commit_assignment(ticket_id, agent_id, "rule_based", 1.0).await.unwrap();
        assert!(committed);

        let updated = agents.get(agent_id).await.unwrap();
        assert_eq!(updated.current_load, 5);

        let updated_ticket = tickets.get(ticket_id).await.unwrap();
        assert_eq!(updated_ticket.assignment.agent_id, Some(agent_id));
    }
}
