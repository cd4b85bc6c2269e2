//! Weighted candidate scoring.
//!
//! Ported from `original_source/src/services/router.py`'s
//! `_calculate_agent_score`.

use crate::domain::Agent;

#[derive(Debug, Clone)]
pub struct RoutingCandidate {
    pub agent_id: uuid::Uuid,
    pub agent_name: String,
    pub team: Option<String>,
    pub score: f64,
    pub reasons: Vec<String>,
    pub current_load: u32,
    pub experience_level: u8,
}

pub struct ScoringInput<'a> {
    pub category: Option<&'a str>,
    pub language: &'a str,
    pub priority: u8,
    pub customer_tier: &'a str,
}

pub fn score_agent(agent: &Agent, input: &ScoringInput) -> RoutingCandidate {
    let mut score: f64 = 50.0;
    let mut reasons = Vec::new();

    if let Some(category) = input.category {
        if agent.can_handle_category(category) {
            score += 30.0;
            reasons.push(format!("skill_match:{category}"));

            let expertise = agent.skill_score(category);
            score += expertise * 10.0;
            reasons.push(format!("expertise:{expertise:.2}"));
        }
    }

    if agent.can_handle_language(input.language) {
        score += 15.0;
        reasons.push(format!("language_match:{}", input.language));
    }

    if input.priority >= 4 {
        score += agent.experience_level as f64 * 5.0;
        reasons.push(format!("experience:{}", agent.experience_level));
    }

    let is_vip_tier = matches!(input.customer_tier, "vip" | "enterprise");
    if is_vip_tier && agent.can_handle_vip {
        score += 20.0;
        reasons.push("vip_handler".to_string());
    }

    if input.priority == 5 && agent.can_handle_critical {
        score += 20.0;
        reasons.push("critical_handler".to_string());
    }

    if agent.max_load > 0 {
        let load_ratio = agent.current_load as f64 / agent.max_load as f64;
        score -= load_ratio * 20.0;
        reasons.push(format!("load_ratio:{load_ratio:.2}"));
    }

    if let Some(csat) = agent.customer_satisfaction_score {
        score += (csat - 3.0) * 5.0;
    }

    if let Some(quality) = agent.quality_score {
        score += (quality / 100.0) * 10.0;
    }

    RoutingCandidate {
        agent_id: agent.id,
        agent_name: agent.name.clone(),
        team: agent.team.clone(),
        score,
        reasons,
        current_load: agent.current_load,
        experience_level: agent.experience_level,
    }
}

/// `argmax` over candidates with tie-breaking: lower `current_load`, then
/// higher `experience_level`, then stable (first-seen) order.
pub fn rank_candidates(mut candidates: Vec<RoutingCandidate>) -> Vec<RoutingCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.current_load.cmp(&b.current_load))
            .then_with(|| b.experience_level.cmp(&a.experience_level))
    });
    candidates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreReason {
    SkillMatch,
    VipHandler,
    CriticalHandler,
    LanguageMatch,
    LoadBalance,
}

/// First-seen qualifier in the winner's breakdown, in the fixed priority
/// order `skill_match -> vip_handler -> critical_handler -> language_match
/// -> load_balance`.
pub fn primary_reason(reasons: &[String]) -> ScoreReason {
    if reasons.iter().any(|r| r.starts_with("skill_match")) {
        ScoreReason::SkillMatch
    } else if reasons.iter().any(|r| r == "vip_handler") {
        ScoreReason::VipHandler
    } else if reasons.iter().any(|r| r == "critical_handler") {
        ScoreReason::CriticalHandler
    } else if reasons.iter().any(|r| r.starts_with("language_match")) {
        ScoreReason::LanguageMatch
    } else {
        ScoreReason::LoadBalance
    }
}

pub fn confidence_from_scores(best: f64, runner_up: Option<f64>) -> f64 {
    match runner_up {
        Some(runner_up) => (0.5 + (best - runner_up) / 100.0).min(0.99),
        None => 0.95,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Agent, AgentRole, AgentStatus, WorkingHours};
    use std::collections::HashMap;

    fn agent() -> Agent {
        Agent {
            id: uuid::Uuid::new_v4(),
            external_id: None,
            email: "a@example.com".to_string(),
            name: "Alice".to_string(),
            role: AgentRole::Agent,
            team: Some("technical_support".to_string()),
            skills: vec!["technical_issue".to_string()],
            languages: vec!["en".to_string()],
            experience_level: 3,
            specializations: HashMap::from([("technical_issue".to_string(), 0.8)]),
            current_load: 2,
            max_load: 10,
            daily_capacity: 20,
            tickets_handled_today: 0,
            tickets_resolved_today: 0,
            status: AgentStatus::Online,
            is_active: true,
            last_active_at: None,
            working_hours: WorkingHours::default(),
            avg_resolution_time_seconds: None,
            avg_first_response_time_seconds: None,
            customer_satisfaction_score: Some(4.0),
            quality_score: Some(90.0),
            total_tickets_resolved: 0,
            tickets_escalated: 0,
            can_handle_critical: false,
            can_handle_vip: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn skill_and_language_match_raise_score_above_base() {
        let candidate = score_agent(
            &agent(),
            &ScoringInput { category: Some("technical_issue"), language: "en", priority: 3, customer_tier: "standard" },
        );
        assert!(candidate.score > 50.0);
        assert_eq!(primary_reason(&candidate.reasons), ScoreReason::SkillMatch);
    }

    #[test]
    fn ranking_breaks_ties_by_lower_load_then_higher_experience() {
        let mut low_load = score_agent(&agent(), &ScoringInput { category: None, language: "de", priority: 1, customer_tier: "standard" });
        low_load.score = 50.0;
        low_load.current_load = 1;

        let mut high_load = low_load.clone();
        high_load.current_load = 5;

        let ranked = rank_candidates(vec![high_load, low_load]);
        assert_eq!(ranked[0].current_load, 1);
    }

    #[test]
    fn confidence_caps_at_0_99() {
        assert_eq!(confidence_from_scores(100.0, Some(-50.0)), 0.99);
    }
}
