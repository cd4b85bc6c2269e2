use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Condition a routing rule matches against. A tagged enum in place of the
/// source's `{rule_type, conditions: JSON}` pair -- each variant carries
/// exactly the fields its rule type needs, so there's nothing to validate
/// at match time beyond what the type system already guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCondition {
    Category { categories: Vec<String> },
    Keyword { keywords: Vec<String>, match_all: bool },
    Sentiment { sentiments: Vec<String> },
    Priority { min_priority: u8, max_priority: u8 },
    Customer { tiers: Vec<String> },
    Language { languages: Vec<String> },
    /// Deliberately never matches. The source left custom rules as an
    /// unimplemented expression evaluator; this keeps that the same
    /// explicit no-op rather than faking an evaluator.
    Custom { expression: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    AssignAgent { agent_id: Uuid },
    AssignTeam { team: String },
    SetPriority { priority: u8 },
    AddTag { tags: Vec<String> },
    Escalate { to_team: Option<String>, reason: String },
    Notify { channels: Vec<String>, recipients: Vec<String> },
    SkipQueue { priority_boost: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRestriction {
    pub active_from: Option<DateTime<Utc>>,
    pub active_until: Option<DateTime<Utc>>,
    pub hours_start: Option<String>,
    pub hours_end: Option<String>,
    /// 0 = Monday ... 6 = Sunday
    pub active_days: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,

    pub condition: RuleCondition,
    pub action: RuleAction,

    /// Evaluation order, higher first.
    pub priority: i32,
    pub is_active: bool,
    /// Stop evaluating further rules after this one matches.
    pub is_exclusive: bool,

    pub applies_to_sources: Option<Vec<String>>,
    pub applies_to_categories: Option<Vec<String>>,
    pub time_restriction: Option<TimeRestriction>,

    pub times_triggered: u64,
    pub last_triggered_at: Option<DateTime<Utc>>,
}

/// The five example rules the source seeds a fresh install with.
pub fn default_routing_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule {
            id: Uuid::new_v4(),
            name: "VIP Customer Priority".to_string(),
            description: Some("Escalate VIP and Enterprise customer tickets".to_string()),
            condition: RuleCondition::Customer {
                tiers: vec!["vip".to_string(), "enterprise".to_string()],
            },
            action: RuleAction::SkipQueue { priority_boost: 2 },
            priority: 100,
            is_active: true,
            is_exclusive: true,
            applies_to_sources: None,
            applies_to_categories: None,
            time_restriction: None,
            times_triggered: 0,
            last_triggered_at: None,
        },
        RoutingRule {
            id: Uuid::new_v4(),
            name: "Angry Customer Escalation".to_string(),
            description: Some("Escalate tickets from angry customers to senior agents".to_string()),
            condition: RuleCondition::Sentiment {
                sentiments: vec!["angry".to_string()],
            },
            action: RuleAction::Escalate {
                to_team: Some("senior_support".to_string()),
                reason: "angry_customer".to_string(),
            },
            priority: 90,
            is_active: true,
            is_exclusive: true,
            applies_to_sources: None,
            applies_to_categories: None,
            time_restriction: None,
            times_triggered: 0,
            last_triggered_at: None,
        },
        RoutingRule {
            id: Uuid::new_v4(),
            name: "Critical Priority Alert".to_string(),
            description: Some("Notify management for critical priority tickets".to_string()),
            condition: RuleCondition::Priority { min_priority: 5, max_priority: 5 },
            action: RuleAction::Notify {
                channels: vec!["email".to_string()],
                recipients: Vec::new(),
            },
            priority: 80,
            is_active: true,
            is_exclusive: false,
            applies_to_sources: None,
            applies_to_categories: None,
            time_restriction: None,
            times_triggered: 0,
            last_triggered_at: None,
        },
        RoutingRule {
            id: Uuid::new_v4(),
            name: "Technical Issues to Tech Team".to_string(),
            description: Some("Route technical issues to technical support team".to_string()),
            condition: RuleCondition::Category {
                categories: vec!["technical_issue".to_string(), "bug_report".to_string()],
            },
            action: RuleAction::AssignTeam { team: "technical_support".to_string() },
            priority: 50,
            is_active: true,
            is_exclusive: true,
            applies_to_sources: None,
            applies_to_categories: None,
            time_restriction: None,
            times_triggered: 0,
            last_triggered_at: None,
        },
        RoutingRule {
            id: Uuid::new_v4(),
            name: "Billing to Finance Team".to_string(),
            description: Some("Route billing questions to finance team".to_string()),
            condition: RuleCondition::Category {
                categories: vec!["billing_question".to_string(), "return_refund".to_string()],
            },
            action: RuleAction::AssignTeam { team: "finance".to_string() },
            priority: 50,
            is_active: true,
            is_exclusive: true,
            applies_to_sources: None,
            applies_to_categories: None,
            time_restriction: None,
            times_triggered: 0,
            last_triggered_at: None,
        },
    ]
}
