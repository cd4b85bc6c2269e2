//! PostgreSQL repositories.
//!
//! Same `deadpool_postgres::Pool` + hand-written SQL style as the
//! teacher's `workspace::tasks::TaskRepository`: pull a client, write the
//! query, map columns back by position. `commit_assignment` is the one
//! place that needs a real transaction -- `SELECT ... FOR UPDATE` on the
//! agent row, guarding the capacity check against a concurrent assignment
//! to the same agent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::domain::{Agent, AgentRole, AgentStatus, Category, Customer, CustomerTier, RoutingRule, Ticket, TicketStatus, WorkingHours};
use crate::error::{AppError, Result};

use super::{AgentRepository, CategoryRepository, CustomerRepository, Page, Pagination, RuleRepository, SortOrder, TicketFilter, TicketRepository};

pub struct PgTicketRepository {
    pool: deadpool_postgres::Pool,
}

impl PgTicketRepository {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }
}

fn ticket_status_sql(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::New => "new",
        TicketStatus::Open => "open",
        TicketStatus::Pending => "pending",
        TicketStatus::InProgress => "in_progress",
        TicketStatus::Resolved => "resolved",
        TicketStatus::Closed => "closed",
        TicketStatus::Escalated => "escalated",
    }
}

fn ticket_status_from_sql(s: &str) -> TicketStatus {
    match s {
        "open" => TicketStatus::Open,
        "pending" => TicketStatus::Pending,
        "in_progress" => TicketStatus::InProgress,
        "resolved" => TicketStatus::Resolved,
        "closed" => TicketStatus::Closed,
        "escalated" => TicketStatus::Escalated,
        _ => TicketStatus::New,
    }
}

fn row_to_ticket(row: &Row) -> Ticket {
    let secondary: serde_json::Value = row.get("secondary_categories");
    let secondary_categories = serde_json::from_value(secondary).unwrap_or_default();
    let priority_factors: serde_json::Value = row.get("priority_factors");
    let suggested: serde_json::Value = row.get("suggested_responses");

    Ticket {
        id: row.get("id"),
        external_id: row.get("external_id"),
        external_system: row.get("external_system"),
        subject: row.get("subject"),
        content: row.get("content"),
        content_cleaned: row.get("content_cleaned"),
        status: ticket_status_from_sql(row.get::<_, &str>("status")),
        category: row.get("category"),
        category_confidence: row.get("category_confidence"),
        secondary_categories,
        classification_reasoning: row.get("classification_reasoning"),
        sentiment: row
            .get::<_, Option<&str>>("sentiment")
            .and_then(|s| serde_json::from_value(serde_json::Value::String(s.to_string())).ok()),
        sentiment_score: row.get("sentiment_score"),
        priority: row.get::<_, i32>("priority") as u8,
        priority_factors: serde_json::from_value(priority_factors).unwrap_or_default(),
        assignment: crate::domain::Assignment {
            agent_id: row.get("agent_id"),
            previous_agent_id: row.get("previous_agent_id"),
            reason: row.get("assignment_reason"),
            confidence: row.get("assignment_confidence"),
            escalated: row.get("escalated"),
            escalation_reason: row.get("escalation_reason"),
        },
        customer_id: row.get("customer_id"),
        customer_email: row.get("customer_email"),
        customer_name: row.get("customer_name"),
        customer_tier: row.get("customer_tier"),
        language: row.get("language"),
        language_confidence: row.get("language_confidence"),
        source: row.get("source"),
        channel: row.get("channel"),
        tags: row.get("tags"),
        suggested_responses: serde_json::from_value(suggested).unwrap_or_default(),
        is_processed: row.get("is_processed"),
        processing_error: row.get("processing_error"),
        sla_due_at: row.get("sla_due_at"),
        sla_breached: row.get("sla_breached"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        first_response_at: row.get("first_response_at"),
        resolved_at: row.get("resolved_at"),
        closed_at: row.get("closed_at"),
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn create(&self, ticket: Ticket) -> Result<Ticket> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO tickets (id, external_id, external_system, subject, content, status,
                    customer_id, customer_email, customer_name, customer_tier, language, source,
                    channel, tags, is_processed, created_at, updated_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
                &[
                    &ticket.id,
                    &ticket.external_id,
                    &ticket.external_system,
                    &ticket.subject,
                    &ticket.content,
                    &ticket_status_sql(ticket.status),
                    &ticket.customer_id,
                    &ticket.customer_email,
                    &ticket.customer_name,
                    &ticket.customer_tier,
                    &ticket.language,
                    &ticket.source,
                    &ticket.channel,
                    &ticket.tags,
                    &ticket.is_processed,
                    &ticket.created_at,
                    &ticket.updated_at,
                ],
            )
            .await?;
        Ok(ticket)
    }

    async fn get(&self, id: Uuid) -> Result<Ticket> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM tickets WHERE id = $1", &[&id])
            .await?
            .ok_or_else(|| AppError::not_found_uuid("ticket", id))?;
        Ok(row_to_ticket(&row))
    }

    async fn update(&self, ticket: Ticket) -> Result<Ticket> {
        let client = self.pool.get().await?;
        let secondary = serde_json::to_value(&ticket.secondary_categories).unwrap_or_default();
        let priority_factors = serde_json::to_value(&ticket.priority_factors).unwrap_or_default();
        let suggested = serde_json::to_value(&ticket.suggested_responses).unwrap_or_default();
        let sentiment_sql = ticket.sentiment.map(|s| match s {
            crate::domain::TicketSentiment::Positive => "positive",
            crate::domain::TicketSentiment::Neutral => "neutral",
            crate::domain::TicketSentiment::Negative => "negative",
            crate::domain::TicketSentiment::Angry => "angry",
        });
        let updated_at = Utc::now();

        let updated = client
            .execute(
                "UPDATE tickets SET status=$2, category=$3, category_confidence=$4,
                    secondary_categories=$5, classification_reasoning=$6, sentiment=$7,
                    sentiment_score=$8, priority=$9, priority_factors=$10, agent_id=$11,
                    previous_agent_id=$12, assignment_reason=$13, assignment_confidence=$14,
                    escalated=$15, escalation_reason=$16, suggested_responses=$17,
                    is_processed=$18, processing_error=$19, sla_due_at=$20, sla_breached=$21,
                    updated_at=$22, first_response_at=$23, resolved_at=$24, closed_at=$25
                 WHERE id=$1",
                &[
                    &ticket.id,
                    &ticket_status_sql(ticket.status),
                    &ticket.category,
                    &ticket.category_confidence,
                    &secondary,
                    &ticket.classification_reasoning,
                    &sentiment_sql,
                    &ticket.sentiment_score,
                    &(ticket.priority as i32),
                    &priority_factors,
                    &ticket.assignment.agent_id,
                    &ticket.assignment.previous_agent_id,
                    &ticket.assignment.reason,
                    &ticket.assignment.confidence,
                    &ticket.assignment.escalated,
                    &ticket.assignment.escalation_reason,
                    &suggested,
                    &ticket.is_processed,
                    &ticket.processing_error,
                    &ticket.sla_due_at,
                    &ticket.sla_breached,
                    &updated_at,
                    &ticket.first_response_at,
                    &ticket.resolved_at,
                    &ticket.closed_at,
                ],
            )
            .await?;

        if updated == 0 {
            return Err(AppError::not_found_uuid("ticket", ticket.id));
        }
        Ok(Ticket { updated_at, ..ticket })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        let deleted = client.execute("DELETE FROM tickets WHERE id = $1", &[&id]).await?;
        if deleted == 0 {
            return Err(AppError::not_found_uuid("ticket", id));
        }
        Ok(())
    }

    async fn list(&self, filter: &TicketFilter, pagination: Pagination, sort: SortOrder) -> Result<Page<Ticket>> {
        let client = self.pool.get().await?;
        let order = match sort {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let mut clauses = Vec::new();
        let mut params: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = Vec::new();
        let status_sql = filter.status.map(ticket_status_sql);

        if let Some(status) = &status_sql {
            clauses.push(format!("status = ${}", params.len() + 1));
            params.push(status);
        }
        if let Some(category) = &filter.category {
            clauses.push(format!("category = ${}", params.len() + 1));
            params.push(category);
        }
        if let Some(customer_id) = &filter.customer_id {
            clauses.push(format!("customer_id = ${}", params.len() + 1));
            params.push(customer_id);
        }
        if let Some(agent_id) = &filter.assigned_agent_id {
            clauses.push(format!("agent_id = ${}", params.len() + 1));
            params.push(agent_id);
        }

        let where_clause = if clauses.is_empty() { String::new() } else { format!("WHERE {}", clauses.join(" AND ")) };
        let sql = format!(
            "SELECT * FROM tickets {where_clause} ORDER BY created_at {order} OFFSET ${} LIMIT ${}",
            params.len() + 1,
            params.len() + 2
        );
        let offset = pagination.offset as i64;
        let limit = pagination.limit as i64;
        params.push(&offset);
        params.push(&limit);

        let rows = client.query(&sql, &params).await?;
        let count_sql = format!("SELECT COUNT(*) FROM tickets {where_clause}");
        let total: i64 = client.query_one(&count_sql, &params[..params.len() - 2]).await?.get(0);

        Ok(Page { items: rows.iter().map(row_to_ticket).collect(), total: total as u64 })
    }

    async fn find_sla_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Ticket>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM tickets WHERE sla_due_at < $1 AND sla_breached = false
                 AND status IN ('new', 'open', 'in_progress')",
                &[&now],
            )
            .await?;
        Ok(rows.iter().map(row_to_ticket).collect())
    }
}

pub struct PgAgentRepository {
    pool: deadpool_postgres::Pool,
}

impl PgAgentRepository {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }
}

fn role_sql(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Agent => "agent",
        AgentRole::SeniorAgent => "senior_agent",
        AgentRole::TeamLead => "team_lead",
        AgentRole::Supervisor => "supervisor",
        AgentRole::Admin => "admin",
    }
}

fn role_from_sql(s: &str) -> AgentRole {
    match s {
        "senior_agent" => AgentRole::SeniorAgent,
        "team_lead" => AgentRole::TeamLead,
        "supervisor" => AgentRole::Supervisor,
        "admin" => AgentRole::Admin,
        _ => AgentRole::Agent,
    }
}

fn status_sql(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Online => "online",
        AgentStatus::Offline => "offline",
        AgentStatus::Busy => "busy",
        AgentStatus::Away => "away",
        AgentStatus::OnBreak => "on_break",
    }
}

fn status_from_sql(s: &str) -> AgentStatus {
    match s {
        "online" => AgentStatus::Online,
        "busy" => AgentStatus::Busy,
        "away" => AgentStatus::Away,
        "on_break" => AgentStatus::OnBreak,
        _ => AgentStatus::Offline,
    }
}

fn row_to_agent(row: &Row) -> Agent {
    let specializations: serde_json::Value = row.get("specializations");
    Agent {
        id: row.get("id"),
        external_id: row.get("external_id"),
        email: row.get("email"),
        name: row.get("name"),
        role: role_from_sql(row.get::<_, &str>("role")),
        team: row.get("team"),
        skills: row.get("skills"),
        languages: row.get("languages"),
        experience_level: row.get::<_, i32>("experience_level") as u8,
        specializations: serde_json::from_value(specializations).unwrap_or_default(),
        current_load: row.get::<_, i32>("current_load") as u32,
        max_load: row.get::<_, i32>("max_load") as u32,
        daily_capacity: row.get::<_, i32>("daily_capacity") as u32,
        tickets_handled_today: row.get::<_, i32>("tickets_handled_today") as u32,
        tickets_resolved_today: row.get::<_, i32>("tickets_resolved_today") as u32,
        status: status_from_sql(row.get::<_, &str>("status")),
        is_active: row.get("is_active"),
        last_active_at: row.get("last_active_at"),
        working_hours: WorkingHours {
            start: row.get("work_hours_start"),
            end: row.get("work_hours_end"),
            timezone: row.get("work_timezone"),
            working_days: row.get::<_, Vec<i32>>("working_days").into_iter().map(|d| d as u8).collect(),
        },
        avg_resolution_time_seconds: row.get("avg_resolution_time_seconds"),
        avg_first_response_time_seconds: row.get("avg_first_response_time_seconds"),
        customer_satisfaction_score: row.get("customer_satisfaction_score"),
        quality_score: row.get("quality_score"),
        total_tickets_resolved: row.get::<_, i64>("total_tickets_resolved") as u64,
        tickets_escalated: row.get::<_, i64>("tickets_escalated") as u64,
        can_handle_critical: row.get("can_handle_critical"),
        can_handle_vip: row.get("can_handle_vip"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl AgentRepository for PgAgentRepository {
    async fn create(&self, agent: Agent) -> Result<Agent> {
        let client = self.pool.get().await?;
        let specializations = serde_json::to_value(&agent.specializations).unwrap_or_default();
        client
            .execute(
                "INSERT INTO agents (id, external_id, email, name, role, team, skills, languages,
                    experience_level, specializations, current_load, max_load, daily_capacity,
                    status, is_active, work_hours_start, work_hours_end, work_timezone, working_days,
                    can_handle_critical, can_handle_vip, created_at, updated_at)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)",
                &[
                    &agent.id,
                    &agent.external_id,
                    &agent.email,
                    &agent.name,
                    &role_sql(agent.role),
                    &agent.team,
                    &agent.skills,
                    &agent.languages,
                    &(agent.experience_level as i32),
                    &specializations,
                    &(agent.current_load as i32),
                    &(agent.max_load as i32),
                    &(agent.daily_capacity as i32),
                    &status_sql(agent.status),
                    &agent.is_active,
                    &agent.working_hours.start,
                    &agent.working_hours.end,
                    &agent.working_hours.timezone,
                    &agent.working_hours.working_days.iter().map(|d| *d as i32).collect::<Vec<_>>(),
                    &agent.can_handle_critical,
                    &agent.can_handle_vip,
                    &agent.created_at,
                    &agent.updated_at,
                ],
            )
            .await?;
        Ok(agent)
    }

    async fn get(&self, id: Uuid) -> Result<Agent> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM agents WHERE id = $1", &[&id])
            .await?
            .ok_or_else(|| AppError::not_found_uuid("agent", id))?;
        Ok(row_to_agent(&row))
    }

    async fn update(&self, agent: Agent) -> Result<Agent> {
        let client = self.pool.get().await?;
        let specializations = serde_json::to_value(&agent.specializations).unwrap_or_default();
        let updated_at = Utc::now();
        client
            .execute(
                "UPDATE agents SET name=$2, team=$3, skills=$4, languages=$5, experience_level=$6,
                    specializations=$7, max_load=$8, daily_capacity=$9, status=$10, is_active=$11,
                    can_handle_critical=$12, can_handle_vip=$13, updated_at=$14
                 WHERE id=$1",
                &[
                    &agent.id,
                    &agent.name,
                    &agent.team,
                    &agent.skills,
                    &agent.languages,
                    &(agent.experience_level as i32),
                    &specializations,
                    &(agent.max_load as i32),
                    &(agent.daily_capacity as i32),
                    &status_sql(agent.status),
                    &agent.is_active,
                    &agent.can_handle_critical,
                    &agent.can_handle_vip,
                    &updated_at,
                ],
            )
            .await?;
        Ok(Agent { updated_at, ..agent })
    }

    async fn set_status(&self, id: Uuid, status: AgentStatus) -> Result<()> {
        let client = self.pool.get().await?;
        let updated = client.execute("UPDATE agents SET status = $2 WHERE id = $1", &[&id, &status_sql(status)]).await?;
        if updated == 0 {
            return Err(AppError::not_found_uuid("agent", id));
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        let updated = client
            .execute("UPDATE agents SET is_active = false, status = 'offline' WHERE id = $1", &[&id])
            .await?;
        if updated == 0 {
            return Err(AppError::not_found_uuid("agent", id));
        }
        Ok(())
    }

    async fn find_available(
        &self,
        category: Option<&str>,
        language: Option<&str>,
        require_vip: bool,
        require_critical: bool,
    ) -> Result<Vec<Agent>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT * FROM agents WHERE is_active = true AND status = 'online' AND current_load < max_load
                 AND ($1::text IS NULL OR $1 = ANY(skills))
                 AND ($2::text IS NULL OR $2 = ANY(languages))
                 AND (NOT $3 OR can_handle_vip)
                 AND (NOT $4 OR can_handle_critical)",
                &[&category, &language, &require_vip, &require_critical],
            )
            .await?;
        Ok(rows.iter().map(row_to_agent).collect())
    }

    async fn reset_daily_counters(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("UPDATE agents SET tickets_handled_today = 0, tickets_resolved_today = 0", &[]).await?;
        Ok(())
    }

    async fn commit_assignment(&self, ticket_id: Uuid, agent_id: Uuid, reason: &str, confidence: f64) -> Result<bool> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await.map_err(AppError::from)?;

        let row = tx
            .query_one("SELECT current_load, max_load FROM agents WHERE id = $1 FOR UPDATE", &[&agent_id])
            .await
            .map_err(AppError::from)?;
        let current_load: i32 = row.get(0);
        let max_load: i32 = row.get(1);

        if current_load >= max_load {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(false);
        }

        tx.execute(
            "UPDATE agents SET current_load = current_load + 1, tickets_handled_today = tickets_handled_today + 1 WHERE id = $1",
            &[&agent_id],
        )
        .await
        .map_err(AppError::from)?;

        tx.execute(
            "UPDATE tickets SET previous_agent_id = agent_id, agent_id = $2, assignment_reason = $3,
                assignment_confidence = $4, updated_at = now() WHERE id = $1",
            &[&ticket_id, &agent_id, &reason, &confidence],
        )
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(true)
    }

    async fn release(&self, agent_id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                "UPDATE agents SET current_load = GREATEST(current_load - 1, 0) WHERE id = $1",
                &[&agent_id],
            )
            .await?;
        Ok(())
    }
}

pub struct PgRuleRepository {
    pool: deadpool_postgres::Pool,
}

impl PgRuleRepository {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }
}

fn row_to_rule(row: &Row) -> RoutingRule {
    let condition: serde_json::Value = row.get("condition");
    let action: serde_json::Value = row.get("action");
    RoutingRule {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        condition: serde_json::from_value(condition).expect("stored routing rule condition must deserialize"),
        action: serde_json::from_value(action).expect("stored routing rule action must deserialize"),
        priority: row.get("priority"),
        is_active: row.get("is_active"),
        is_exclusive: row.get("is_exclusive"),
        applies_to_sources: row.get("applies_to_sources"),
        applies_to_categories: row.get("applies_to_categories"),
        time_restriction: None,
        times_triggered: row.get::<_, i64>("times_triggered") as u64,
        last_triggered_at: row.get("last_triggered_at"),
    }
}

#[async_trait]
impl RuleRepository for PgRuleRepository {
    async fn list_active(&self) -> Result<Vec<RoutingRule>> {
        let client = self.pool.get().await?;
        let rows = client
            .query("SELECT * FROM routing_rules WHERE is_active = true ORDER BY priority DESC", &[])
            .await?;
        Ok(rows.iter().map(row_to_rule).collect())
    }

    async fn upsert(&self, rule: RoutingRule) -> Result<RoutingRule> {
        let client = self.pool.get().await?;
        let condition = serde_json::to_value(&rule.condition).unwrap_or_default();
        let action = serde_json::to_value(&rule.action).unwrap_or_default();
        client
            .execute(
                "INSERT INTO routing_rules (id, name, description, condition, action, priority,
                    is_active, is_exclusive, applies_to_sources, applies_to_categories)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
                 ON CONFLICT (id) DO UPDATE SET name=EXCLUDED.name, description=EXCLUDED.description,
                    condition=EXCLUDED.condition, action=EXCLUDED.action, priority=EXCLUDED.priority,
                    is_active=EXCLUDED.is_active, is_exclusive=EXCLUDED.is_exclusive,
                    applies_to_sources=EXCLUDED.applies_to_sources, applies_to_categories=EXCLUDED.applies_to_categories",
                &[
                    &rule.id,
                    &rule.name,
                    &rule.description,
                    &condition,
                    &action,
                    &rule.priority,
                    &rule.is_active,
                    &rule.is_exclusive,
                    &rule.applies_to_sources,
                    &rule.applies_to_categories,
                ],
            )
            .await?;
        Ok(rule)
    }
}

pub struct PgCategoryRepository {
    pool: deadpool_postgres::Pool,
}

impl PgCategoryRepository {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }
}

fn row_to_category(row: &Row) -> Category {
    Category {
        name: row.get("name"),
        display_name: row.get("display_name"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        is_default: row.get("is_default"),
        priority_boost: row.get("priority_boost"),
        sla_first_response_hours: row.get("sla_first_response_hours"),
        sla_resolution_hours: row.get("sla_resolution_hours"),
        keywords: row.get("keywords"),
        negative_keywords: row.get("negative_keywords"),
        default_team: row.get("default_team"),
        escalation_team: row.get("escalation_team"),
        requires_senior: row.get("requires_senior"),
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn list_active(&self) -> Result<Vec<Category>> {
        let client = self.pool.get().await?;
        let rows = client.query("SELECT * FROM categories WHERE is_active = true", &[]).await?;
        Ok(rows.iter().map(row_to_category).collect())
    }

    async fn upsert(&self, category: Category) -> Result<Category> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO categories (name, display_name, description, is_active, is_default,
                    priority_boost, sla_first_response_hours, sla_resolution_hours, keywords,
                    negative_keywords, default_team, escalation_team, requires_senior)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
                 ON CONFLICT (name) DO UPDATE SET display_name=EXCLUDED.display_name,
                    description=EXCLUDED.description, is_active=EXCLUDED.is_active,
                    is_default=EXCLUDED.is_default, priority_boost=EXCLUDED.priority_boost,
                    sla_first_response_hours=EXCLUDED.sla_first_response_hours,
                    sla_resolution_hours=EXCLUDED.sla_resolution_hours, keywords=EXCLUDED.keywords,
                    negative_keywords=EXCLUDED.negative_keywords, default_team=EXCLUDED.default_team,
                    escalation_team=EXCLUDED.escalation_team, requires_senior=EXCLUDED.requires_senior",
                &[
                    &category.name,
                    &category.display_name,
                    &category.description,
                    &category.is_active,
                    &category.is_default,
                    &category.priority_boost,
                    &category.sla_first_response_hours,
                    &category.sla_resolution_hours,
                    &category.keywords,
                    &category.negative_keywords,
                    &category.default_team,
                    &category.escalation_team,
                    &category.requires_senior,
                ],
            )
            .await?;
        Ok(category)
    }
}

pub struct PgCustomerRepository {
    pool: deadpool_postgres::Pool,
}

impl PgCustomerRepository {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }
}

fn tier_sql(tier: CustomerTier) -> &'static str {
    match tier {
        CustomerTier::Free => "free",
        CustomerTier::Standard => "standard",
        CustomerTier::Premium => "premium",
        CustomerTier::Vip => "vip",
        CustomerTier::Enterprise => "enterprise",
    }
}

fn tier_from_sql(s: &str) -> CustomerTier {
    match s {
        "free" => CustomerTier::Free,
        "premium" => CustomerTier::Premium,
        "vip" => CustomerTier::Vip,
        "enterprise" => CustomerTier::Enterprise,
        _ => CustomerTier::Standard,
    }
}

fn row_to_customer(row: &Row) -> Customer {
    Customer {
        id: row.get("id"),
        external_id: row.get("external_id"),
        email: row.get("email"),
        name: row.get("name"),
        tier: tier_from_sql(row.get::<_, &str>("tier")),
        is_active: row.get("is_active"),
        preferred_language: row.get("preferred_language"),
        total_tickets: row.get::<_, i32>("total_tickets") as u32,
        avg_satisfaction: row.get("avg_satisfaction"),
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn get(&self, id: Uuid) -> Result<Customer> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt("SELECT * FROM customers WHERE id = $1", &[&id])
            .await?
            .ok_or_else(|| AppError::not_found_uuid("customer", id))?;
        Ok(row_to_customer(&row))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let client = self.pool.get().await?;
        Ok(client.query_opt("SELECT * FROM customers WHERE email = $1", &[&email]).await?.as_ref().map(row_to_customer))
    }

    async fn upsert(&self, customer: Customer) -> Result<Customer> {
        let client = self.pool.get().await?;
        client
            .execute(
                "INSERT INTO customers (id, external_id, email, name, tier, is_active, preferred_language,
                    total_tickets, avg_satisfaction)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
                 ON CONFLICT (id) DO UPDATE SET name=EXCLUDED.name, tier=EXCLUDED.tier,
                    is_active=EXCLUDED.is_active, preferred_language=EXCLUDED.preferred_language,
                    total_tickets=EXCLUDED.total_tickets, avg_satisfaction=EXCLUDED.avg_satisfaction",
                &[
                    &customer.id,
                    &customer.external_id,
                    &customer.email,
                    &customer.name,
                    &tier_sql(customer.tier),
                    &customer.is_active,
                    &customer.preferred_language,
                    &(customer.total_tickets as i32),
                    &customer.avg_satisfaction,
                ],
            )
            .await?;
        Ok(customer)
    }
}
