use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Online,
    Offline,
    Busy,
    Away,
    OnBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Agent,
    SeniorAgent,
    TeamLead,
    Supervisor,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
    pub timezone: String,
    /// 0 = Monday ... 6 = Sunday
    pub working_days: Vec<u8>,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "18:00".to_string(),
            timezone: "UTC".to_string(),
            working_days: vec![0, 1, 2, 3, 4],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub email: String,
    pub name: String,

    pub role: AgentRole,
    pub team: Option<String>,

    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub experience_level: u8,
    /// category -> expertise score (0.0-1.0), defaults to 0.5 when absent.
    pub specializations: HashMap<String, f64>,

    pub current_load: u32,
    pub max_load: u32,
    pub daily_capacity: u32,
    pub tickets_handled_today: u32,
    pub tickets_resolved_today: u32,

    pub status: AgentStatus,
    pub is_active: bool,
    pub last_active_at: Option<DateTime<Utc>>,

    pub working_hours: WorkingHours,

    pub avg_resolution_time_seconds: Option<i64>,
    pub avg_first_response_time_seconds: Option<i64>,
    pub customer_satisfaction_score: Option<f64>,
    pub quality_score: Option<f64>,

    pub total_tickets_resolved: u64,
    pub tickets_escalated: u64,

    pub can_handle_critical: bool,
    pub can_handle_vip: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn is_available(&self) -> bool {
        self.is_active && self.status == AgentStatus::Online && self.current_load < self.max_load
    }

    pub fn load_percentage(&self) -> f64 {
        if self.max_load == 0 {
            return 100.0;
        }
        (self.current_load as f64 / self.max_load as f64) * 100.0
    }

    pub fn available_capacity(&self) -> u32 {
        self.max_load.saturating_sub(self.current_load)
    }

    pub fn can_handle_category(&self, category: &str) -> bool {
        self.skills.iter().any(|s| s == category)
    }

    pub fn can_handle_language(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }

    pub fn skill_score(&self, category: &str) -> f64 {
        self.specializations.get(category).copied().unwrap_or(0.5)
    }
}
