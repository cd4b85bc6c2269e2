//! Persistence traits.
//!
//! Narrow `async_trait`s the core actually calls, not a generic ORM
//! surface -- the same shape as the teacher's `workspace::tasks`/
//! `workspace::learnings` modules (a handful of purpose-built methods over
//! a pool, not a repository-of-everything abstraction).

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Agent, AgentStatus, Category, Customer, RoutingRule, Ticket};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<crate::domain::TicketStatus>,
    pub category: Option<String>,
    pub customer_id: Option<Uuid>,
    pub assigned_agent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, ticket: Ticket) -> Result<Ticket>;
    async fn get(&self, id: Uuid) -> Result<Ticket>;
    async fn update(&self, ticket: Ticket) -> Result<Ticket>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn list(&self, filter: &TicketFilter, pagination: Pagination, sort: SortOrder) -> Result<Page<Ticket>>;

    /// Tickets eligible for SLA breach: `sla_due_at < now`, not already
    /// breached, still in an open-ish status.
    async fn find_sla_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>>;
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn create(&self, agent: Agent) -> Result<Agent>;
    async fn get(&self, id: Uuid) -> Result<Agent>;
    async fn update(&self, agent: Agent) -> Result<Agent>;
    async fn set_status(&self, id: Uuid, status: AgentStatus) -> Result<()>;
    /// Soft delete: `is_active = false`, `status = offline`.
    async fn deactivate(&self, id: Uuid) -> Result<()>;

    async fn find_available(
        &self,
        category: Option<&str>,
        language: Option<&str>,
        require_vip: bool,
        require_critical: bool,
    ) -> Result<Vec<Agent>>;

    async fn reset_daily_counters(&self) -> Result<()>;

    /// The assignment commit protocol of spec.md §4.6: row-locks the
    /// agent, checks `current_load < max_load`, increments it and writes
    /// the ticket's `agent_id`/`assignment_reason`/`assignment_confidence`
    /// atomically. Returns `false` (no error) if the agent was at
    /// capacity by the time the lock was acquired -- the caller retries
    /// routing, it does not treat this as a failure.
    async fn commit_assignment(
        &self,
        ticket_id: Uuid,
        agent_id: Uuid,
        reason: &str,
        confidence: f64,
    ) -> Result<bool>;

    /// Decrements `current_load` for the previously assigned agent as part
    /// of a reassignment, in the same transaction as the new assignment's
    /// commit at the call site.
    async fn release(&self, agent_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<RoutingRule>>;
    async fn upsert(&self, rule: RoutingRule) -> Result<RoutingRule>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Category>>;
    async fn upsert(&self, category: Category) -> Result<Category>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Customer>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>>;
    async fn upsert(&self, customer: Customer) -> Result<Customer>;
}
