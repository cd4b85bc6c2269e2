use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    Open,
    Pending,
    InProgress,
    Resolved,
    Closed,
    Escalated,
}

/// 1 (minimal) through 5 (critical). Kept as a plain `u8` on `Ticket` so
/// arithmetic (clamping, boosts) doesn't need a round trip through the enum;
/// `TicketPriority` exists for call sites that want the named levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum TicketPriority {
    Minimal = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Critical = 5,
}

impl TicketPriority {
    pub fn from_score(score: u8) -> Self {
        match score.clamp(1, 5) {
            1 => Self::Minimal,
            2 => Self::Low,
            3 => Self::Medium,
            4 => Self::High,
            _ => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketSentiment {
    Positive,
    Neutral,
    Negative,
    Angry,
}

/// One scored contribution to a priority calculation, kept for audit/explainability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityFactor {
    pub name: String,
    pub weight: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub external_system: Option<String>,

    pub subject: Option<String>,
    pub content: String,
    pub content_cleaned: Option<String>,

    pub status: TicketStatus,

    pub category: Option<String>,
    pub category_confidence: Option<f64>,
    pub secondary_categories: Vec<(String, f64)>,
    pub classification_reasoning: Option<String>,

    pub sentiment: Option<TicketSentiment>,
    pub sentiment_score: Option<f64>,

    pub priority: u8,
    pub priority_factors: Vec<PriorityFactor>,

    pub assignment: Assignment,

    pub customer_id: Option<Uuid>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub customer_tier: Option<String>,

    pub language: String,
    pub language_confidence: Option<f64>,

    pub source: String,
    pub channel: Option<String>,
    pub tags: Vec<String>,

    pub suggested_responses: Vec<super::SuggestedResponse>,

    pub is_processed: bool,
    pub processing_error: Option<String>,

    pub sla_due_at: Option<DateTime<Utc>>,
    pub sla_breached: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Routing outcome. Deliberately one-directional (`agent_id` only) -- the
/// reverse lookup (an agent's tickets) goes through the repository rather
/// than a back-reference on this struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: Option<Uuid>,
    pub previous_agent_id: Option<Uuid>,
    pub reason: Option<String>,
    pub confidence: Option<f64>,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
}

impl Ticket {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id: None,
            external_system: None,
            subject: None,
            content: content.into(),
            content_cleaned: None,
            status: TicketStatus::New,
            category: None,
            category_confidence: None,
            secondary_categories: Vec::new(),
            classification_reasoning: None,
            sentiment: None,
            sentiment_score: None,
            priority: 3,
            priority_factors: Vec::new(),
            assignment: Assignment::default(),
            customer_id: None,
            customer_email: None,
            customer_name: None,
            customer_tier: None,
            language: String::new(),
            language_confidence: None,
            source: source.into(),
            channel: None,
            tags: Vec::new(),
            suggested_responses: Vec::new(),
            is_processed: false,
            processing_error: None,
            sla_due_at: None,
            sla_breached: false,
            created_at: now,
            updated_at: now,
            first_response_at: None,
            resolved_at: None,
            closed_at: None,
        }
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority >= 4
    }

    /// Bumps priority by one level, capped at 5. Called wherever a ticket
    /// is marked escalated, so `escalated => priority` reflects the bump
    /// regardless of which path triggered the escalation.
    pub fn bump_priority_for_escalation(&mut self) {
        self.priority = (self.priority + 1).min(5);
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.sla_due_at.is_some_and(|due| now > due)
    }

    pub fn response_time_seconds(&self) -> Option<i64> {
        self.first_response_at
            .map(|t| (t - self.created_at).num_seconds())
    }

    pub fn resolution_time_seconds(&self) -> Option<i64> {
        self.resolved_at
            .map(|t| (t - self.created_at).num_seconds())
    }
}
