use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerTier {
    Free,
    Standard,
    Premium,
    Vip,
    Enterprise,
}

impl CustomerTier {
    /// Added to calculated ticket priority.
    pub fn priority_boost(self) -> i32 {
        match self {
            Self::Free => -1,
            Self::Standard => 0,
            Self::Premium => 1,
            Self::Vip | Self::Enterprise => 2,
        }
    }

    /// SLA time multiplier; lower means a faster required response.
    pub fn sla_multiplier(self) -> f64 {
        match self {
            Self::Free => 2.0,
            Self::Standard => 1.0,
            Self::Premium => 0.75,
            Self::Vip => 0.5,
            Self::Enterprise => 0.25,
        }
    }

    pub fn is_vip(self) -> bool {
        matches!(self, Self::Vip | Self::Enterprise)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub email: String,
    pub name: Option<String>,

    pub tier: CustomerTier,
    pub is_active: bool,

    pub preferred_language: String,

    pub total_tickets: u32,
    pub avg_satisfaction: Option<f64>,
}

impl Customer {
    pub fn priority_boost(&self) -> i32 {
        self.tier.priority_boost()
    }

    pub fn sla_multiplier(&self) -> f64 {
        self.tier.sla_multiplier()
    }
}
