//! Ticket routing: candidate selection, rule evaluation, weighted scoring.
//!
//! Grounded on `original_source/src/services/router.py`'s `TicketRouter`.
//! The source couples candidate lookup directly to a SQLAlchemy session;
//! here `route()` takes the already-fetched candidate `Agent`s and
//! `RoutingRule`s as plain slices, so the router stays pure and the
//! repository lookups (including the `SELECT ... FOR UPDATE` commit) live
//! in `repository`/`pipeline` where the transaction actually happens.

mod rules;
mod scoring;

pub use rules::RuleContext;
pub use scoring::{RoutingCandidate, ScoringInput};

use chrono::{Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Agent, RoutingRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingReason {
    SkillMatch,
    LanguageMatch,
    VipHandler,
    CriticalHandler,
    LoadBalance,
    RoundRobin,
    RuleBased,
    Escalation,
    NoAvailableAgents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub agent_id: Uuid,
    pub agent_name: String,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub agent_id: Option<Uuid>,
    pub agent_name: Option<String>,
    pub team: Option<String>,
    pub reason: RoutingReason,
    pub confidence: f64,
    pub score: Option<f64>,
    pub score_breakdown: Vec<String>,
    pub alternatives: Vec<AlternativeCandidate>,
    pub rule_name: Option<String>,
    pub escalation_reason: Option<String>,
    pub message: Option<String>,
}

impl RouteDecision {
    fn no_agents(message: &str) -> Self {
        Self {
            agent_id: None,
            agent_name: None,
            team: None,
            reason: RoutingReason::NoAvailableAgents,
            confidence: 0.0,
            score: None,
            score_breakdown: Vec::new(),
            alternatives: Vec::new(),
            rule_name: None,
            escalation_reason: None,
            message: Some(message.to_string()),
        }
    }
}

pub struct RouteInput<'a> {
    pub category: Option<&'a str>,
    pub priority: u8,
    pub language: &'a str,
    pub customer_tier: &'a str,
    pub source: Option<&'a str>,
    pub content: &'a str,
    pub subject: &'a str,
    pub sentiment: Option<&'a str>,
}

pub struct TicketRouter;

impl TicketRouter {
    pub fn new() -> Self {
        Self
    }

    /// `candidates` must already satisfy `is_active ∧ status = online ∧
    /// current_load < max_load` -- that snapshot comes from
    /// `AgentRepository::find_available`. This function applies the
    /// VIP/critical gating, working-hours filter, rule evaluation and
    /// scoring on top of it.
    pub fn route(&self, input: &RouteInput, candidates: &[Agent], rules: &[RoutingRule]) -> RouteDecision {
        let require_vip = matches!(input.customer_tier, "vip" | "enterprise");
        let require_critical = input.priority == 5;

        let mut pool: Vec<&Agent> = candidates
            .iter()
            .filter(|a| !require_vip || a.can_handle_vip)
            .filter(|a| !require_critical || a.can_handle_critical)
            .collect();

        if pool.is_empty() {
            pool = candidates.iter().collect();
        }
        if pool.is_empty() {
            return RouteDecision::no_agents("No agents currently available");
        }

        let working_hours_pool: Vec<&Agent> = pool.iter().copied().filter(|a| is_within_working_hours(a)).collect();
        let pool = if working_hours_pool.is_empty() { pool } else { working_hours_pool };

        let ctx = RuleContext {
            category: input.category,
            priority: input.priority,
            language: input.language,
            customer_tier: input.customer_tier,
            source: input.source,
            content: input.content,
            subject: input.subject,
            sentiment: input.sentiment,
        };

        if let Some(decision) = self.apply_rules(&ctx, &pool, rules) {
            return decision;
        }

        self.score_and_select(input, &pool)
    }

    fn apply_rules(&self, ctx: &RuleContext, pool: &[&Agent], rules: &[RoutingRule]) -> Option<RouteDecision> {
        let mut ordered: Vec<&RoutingRule> = rules.iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

        for rule in ordered {
            if !rules::matches(rule, ctx) {
                continue;
            }

            match &rule.action {
                crate::domain::RuleAction::AssignAgent { agent_id } => {
                    if let Some(agent) = pool.iter().find(|a| a.id == *agent_id) {
                        return Some(RouteDecision {
                            agent_id: Some(agent.id),
                            agent_name: Some(agent.name.clone()),
                            team: agent.team.clone(),
                            reason: RoutingReason::RuleBased,
                            confidence: 1.0,
                            score: None,
                            score_breakdown: Vec::new(),
                            alternatives: Vec::new(),
                            rule_name: Some(rule.name.clone()),
                            escalation_reason: None,
                            message: None,
                        });
                    }
                }
                crate::domain::RuleAction::AssignTeam { team } => {
                    let best = pool.iter().filter(|a| a.team.as_deref() == Some(team.as_str())).min_by_key(|a| a.current_load);
                    if let Some(agent) = best {
                        return Some(RouteDecision {
                            agent_id: Some(agent.id),
                            agent_name: Some(agent.name.clone()),
                            team: agent.team.clone(),
                            reason: RoutingReason::RuleBased,
                            confidence: 0.9,
                            score: None,
                            score_breakdown: Vec::new(),
                            alternatives: Vec::new(),
                            rule_name: Some(rule.name.clone()),
                            escalation_reason: None,
                            message: None,
                        });
                    }
                }
                crate::domain::RuleAction::Escalate { to_team, reason } => {
                    return Some(RouteDecision {
                        agent_id: None,
                        agent_name: None,
                        team: to_team.clone(),
                        reason: RoutingReason::Escalation,
                        confidence: 1.0,
                        score: None,
                        score_breakdown: Vec::new(),
                        alternatives: Vec::new(),
                        rule_name: Some(rule.name.clone()),
                        escalation_reason: Some(reason.clone()),
                        message: None,
                    });
                }
                // `set_priority`, `add_tag`, `notify`, `skip_queue` are non-terminal:
                // they attach to the eventual decision upstream but don't stop
                // rule evaluation unless `is_exclusive`.
                _ => {
                    if rule.is_exclusive {
                        break;
                    }
                }
            }
        }
        None
    }

    fn score_and_select(&self, input: &RouteInput, pool: &[&Agent]) -> RouteDecision {
        let scoring_input =
            ScoringInput { category: input.category, language: input.language, priority: input.priority, customer_tier: input.customer_tier };

        let candidates: Vec<RoutingCandidate> = pool.iter().map(|agent| scoring::score_agent(agent, &scoring_input)).collect();
        let ranked = scoring::rank_candidates(candidates);

        let best = &ranked[0];
        let runner_up = ranked.get(1).map(|c| c.score);
        let confidence = scoring::confidence_from_scores(best.score, runner_up);

        let reason = match scoring::primary_reason(&best.reasons) {
            scoring::ScoreReason::SkillMatch => RoutingReason::SkillMatch,
            scoring::ScoreReason::VipHandler => RoutingReason::VipHandler,
            scoring::ScoreReason::CriticalHandler => RoutingReason::CriticalHandler,
            scoring::ScoreReason::LanguageMatch => RoutingReason::LanguageMatch,
            scoring::ScoreReason::LoadBalance => RoutingReason::LoadBalance,
        };

        let alternatives = ranked
            .iter()
            .skip(1)
            .take(3)
            .map(|c| AlternativeCandidate { agent_id: c.agent_id, agent_name: c.agent_name.clone(), score: c.score, reasons: c.reasons.clone() })
            .collect();

        RouteDecision {
            agent_id: Some(best.agent_id),
            agent_name: Some(best.agent_name.clone()),
            team: best.team.clone(),
            reason,
            confidence: (confidence * 1000.0).round() / 1000.0,
            score: Some((best.score * 100.0).round() / 100.0),
            score_breakdown: best.reasons.clone(),
            alternatives,
            rule_name: None,
            escalation_reason: None,
            message: None,
        }
    }

    /// Re-runs `route`, then walks the alternatives list for the first
    /// candidate not in `exclude` if the winner is excluded.
    pub fn reassign(&self, input: &RouteInput, candidates: &[Agent], rules: &[RoutingRule], exclude: &[Uuid]) -> RouteDecision {
        let mut decision = self.route(input, candidates, rules);

        if decision.agent_id.is_some_and(|id| exclude.contains(&id)) {
            if let Some(alt) = decision.alternatives.iter().find(|a| !exclude.contains(&a.agent_id)) {
                decision.agent_id = Some(alt.agent_id);
                decision.agent_name = Some(alt.agent_name.clone());
                decision.reason = RoutingReason::LoadBalance;
            } else {
                return RouteDecision::no_agents("No eligible agent remains after exclusions");
            }
        }

        decision
    }

    pub fn recommendations(&self, input: &RouteInput, candidates: &[Agent], limit: usize) -> Vec<RoutingCandidate> {
        let scoring_input =
            ScoringInput { category: input.category, language: input.language, priority: input.priority, customer_tier: input.customer_tier };
        let scored: Vec<RoutingCandidate> = candidates.iter().map(|agent| scoring::score_agent(agent, &scoring_input)).collect();
        let mut ranked = scoring::rank_candidates(scored);
        ranked.truncate(limit);
        ranked
    }
}

impl Default for TicketRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirrors `original_source/src/services/router.py::_is_within_working_hours`,
/// which checks day-of-week and `HH:MM` bounds against `datetime.utcnow()`
/// regardless of the agent's own `working_hours.timezone` field -- a quirk
/// of the source kept here rather than silently fixed.
fn is_within_working_hours(agent: &Agent) -> bool {
    let now = Utc::now();
    let weekday = now.weekday().num_days_from_monday() as u8;
    if !agent.working_hours.working_days.contains(&weekday) {
        return false;
    }
    let current = format!("{:02}:{:02}", now.hour(), now.minute());
    agent.working_hours.start.as_str() <= current.as_str() && current.as_str() <= agent.working_hours.end.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentRole, AgentStatus, WorkingHours};
    use std::collections::HashMap;

    fn agent(name: &str, skills: &[&str], load: u32) -> Agent {
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
            current_load: load,
            max_load: 10,
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

    fn input<'a>() -> RouteInput<'a> {
        RouteInput {
            category: Some("technical_issue"),
            priority: 3,
            language: "en",
            customer_tier: "standard",
            source: None,
            content: "my app is broken",
            subject: "",
            sentiment: None,
        }
    }

    #[test]
    fn no_candidates_returns_no_available_agents() {
        let router = TicketRouter::new();
        let decision = router.route(&input(), &[], &[]);
        assert_eq!(decision.reason, RoutingReason::NoAvailableAgents);
        assert!(decision.agent_id.is_none());
    }

    #[test]
    fn picks_lower_load_agent_when_skills_tie() {
        let router = TicketRouter::new();
        let busy = agent("busy", &["technical_issue"], 8);
        let free = agent("free", &["technical_issue"], 1);
        let decision = router.route(&input(), &[busy, free], &[]);
        assert_eq!(decision.agent_name.as_deref(), Some("free"));
    }

    #[test]
    fn category_rule_overrides_scoring() {
        let router = TicketRouter::new();
        let billing = agent("billing_person", &["billing_question"], 0);
        let tech = agent("tech_person", &["technical_issue"], 0);
        let rules = crate::domain::default_routing_rules();
        let decision = router.route(&input(), &[billing, tech], &rules);
        assert_eq!(decision.reason, RoutingReason::RuleBased);
        assert_eq!(decision.agent_name.as_deref(), Some("tech_person"));
    }

    #[test]
    fn reassign_skips_excluded_winner_for_best_alternative() {
        let router = TicketRouter::new();
        let a = agent("a", &["technical_issue"], 0);
        let b = agent("b", &["technical_issue"], 1);
        let initial = router.route(&input(), &[a.clone(), b.clone()], &[]);
        let winner_id = initial.agent_id.unwrap();

        let reassigned = router.reassign(&input(), &[a, b], &[], &[winner_id]);
        assert_ne!(reassigned.agent_id, Some(winner_id));
    }
}
