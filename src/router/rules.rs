//! Typed rule matching.
//!
//! Ported from `original_source/src/models/rule.py`'s `RoutingRule.matches`
//! / `_check_time_restrictions` / `_evaluate_conditions`, using the tagged
//! `RuleCondition` enum in `domain::rule` in place of the source's
//! `{rule_type, conditions: JSON}` pair.

use chrono::{Datelike, Timelike, Utc};

use crate::domain::{RoutingRule, RuleCondition};

/// The ticket-shaped view a rule matches against. Mirrors the source's
/// `ticket_data` dict built in `TicketRouter.route`.
pub struct RuleContext<'a> {
    pub category: Option<&'a str>,
    pub priority: u8,
    pub language: &'a str,
    pub customer_tier: &'a str,
    pub source: Option<&'a str>,
    pub content: &'a str,
    pub subject: &'a str,
    pub sentiment: Option<&'a str>,
}

pub fn matches(rule: &RoutingRule, ctx: &RuleContext) -> bool {
    if !rule.is_active {
        return false;
    }
    if !within_time_restrictions(rule) {
        return false;
    }
    if let Some(sources) = &rule.applies_to_sources {
        if let Some(source) = ctx.source {
            if !sources.iter().any(|s| s == source) {
                return false;
            }
        }
    }
    if let Some(categories) = &rule.applies_to_categories {
        if let Some(category) = ctx.category {
            if !categories.iter().any(|c| c == category) {
                return false;
            }
        }
    }
    evaluate_condition(&rule.condition, ctx)
}

fn within_time_restrictions(rule: &RoutingRule) -> bool {
    let Some(restriction) = &rule.time_restriction else { return true };
    let now = Utc::now();

    if let Some(from) = restriction.active_from {
        if now < from {
            return false;
        }
    }
    if let Some(until) = restriction.active_until {
        if now > until {
            return false;
        }
    }
    if let Some(days) = &restriction.active_days {
        if !days.contains(&(now.weekday().num_days_from_monday() as u8)) {
            return false;
        }
    }
    if let (Some(start), Some(end)) = (&restriction.hours_start, &restriction.hours_end) {
        let current = format!("{:02}:{:02}", now.hour(), now.minute());
        if !(start.as_str() <= current.as_str() && current.as_str() <= end.as_str()) {
            return false;
        }
    }
    true
}

fn evaluate_condition(condition: &RuleCondition, ctx: &RuleContext) -> bool {
    match condition {
        RuleCondition::Category { categories } => {
            ctx.category.is_some_and(|c| categories.iter().any(|v| v == c))
        }
        RuleCondition::Keyword { keywords, match_all } => {
            let haystack = format!("{} {}", ctx.content, ctx.subject).to_lowercase();
            if *match_all {
                keywords.iter().all(|kw| haystack.contains(&kw.to_lowercase()))
            } else {
                keywords.iter().any(|kw| haystack.contains(&kw.to_lowercase()))
            }
        }
        RuleCondition::Sentiment { sentiments } => {
            ctx.sentiment.is_some_and(|s| sentiments.iter().any(|v| v == s))
        }
        RuleCondition::Priority { min_priority, max_priority } => {
            *min_priority <= ctx.priority && ctx.priority <= *max_priority
        }
        RuleCondition::Customer { tiers } => tiers.iter().any(|t| t == ctx.customer_tier),
        RuleCondition::Language { languages } => languages.iter().any(|l| l == ctx.language),
        // Deliberately never matches -- see domain::rule::RuleCondition::Custom.
        RuleCondition::Custom { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_routing_rules;

    fn ctx<'a>() -> RuleContext<'a> {
        RuleContext {
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
    fn category_rule_matches_when_category_is_in_list() {
        let rules = default_routing_rules();
        let rule = rules.iter().find(|r| r.name == "Technical Issues to Tech Team").unwrap();
        assert!(matches(rule, &ctx()));
    }

    #[test]
    fn vip_rule_requires_tier_membership() {
        let rules = default_routing_rules();
        let rule = rules.iter().find(|r| r.name == "VIP Customer Priority").unwrap();
        assert!(!matches(rule, &ctx()));

        let mut vip_ctx = ctx();
        vip_ctx.customer_tier = "vip";
        assert!(matches(rule, &vip_ctx));
    }

    #[test]
    fn custom_condition_never_matches() {
        let rule = RoutingRule {
            id: uuid::Uuid::new_v4(),
            name: "custom".to_string(),
            description: None,
            condition: RuleCondition::Custom { expression: "priority > 3".to_string() },
            action: crate::domain::RuleAction::AddTag { tags: vec!["x".to_string()] },
            priority: 0,
            is_active: true,
            is_exclusive: true,
            applies_to_sources: None,
            applies_to_categories: None,
            time_restriction: None,
            times_triggered: 0,
            last_triggered_at: None,
        };
        assert!(!matches(&rule, &ctx()));
    }
}
