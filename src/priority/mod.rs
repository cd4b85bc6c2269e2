//! Priority scoring: additive weighted factors on top of a base score of
//! 3, clamped to 1..5.
//!
//! Grounded on `original_source/src/services/priority_scorer.py`'s
//! `PriorityScorer`. Deliberately pure and synchronous -- no provider
//! calls, no I/O.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::PriorityFactor;
use crate::sentiment::Sentiment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl PriorityLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            5 => Self::Critical,
            4 => Self::High,
            3 => Self::Medium,
            2 => Self::Low,
            _ => Self::Minimal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPatterns {
    pub caps_ratio: f64,
    pub exclamation_count: usize,
    pub question_marks: usize,
    pub word_count: usize,
    pub has_deadline_mention: bool,
    pub has_money_mention: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub base_score: i32,
    pub total_adjustment: i32,
    pub final_score: u8,
    pub text_patterns: TextPatterns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityResult {
    pub score: u8,
    pub level: PriorityLevel,
    pub factors: Vec<PriorityFactor>,
    pub breakdown: PriorityBreakdown,
}

/// A caller-supplied custom rule, applied after the built-in factors. The
/// `CustomerField` variant is how a category's `priority_boost` (or any
/// other metadata-driven boost) gets included without the scorer reading
/// the category repository directly -- see the Open Question resolution.
#[derive(Debug, Clone)]
pub enum CustomPriorityRule {
    Keyword { name: String, keywords: Vec<String>, weight: i32, description: String },
    CustomerField { name: String, field: String, value: String, weight: i32, description: String },
}

const URGENT_EN: &[&str] = &[
    "urgent", "asap", "immediately", "critical", "emergency", "right now", "can't wait",
    "deadline", "down", "outage",
];
const URGENT_TR: &[&str] = &[
    "acil", "hemen", "kritik", "acilen", "ivedi", "derhal", "bekleyemez", "şimdi", "çöktü",
    "erişilemiyor",
];
const HIGH_EN: &[&str] = &[
    "not working", "broken", "error", "can't access", "failed", "stuck", "blocked", "crash",
    "lost", "missing", "deleted",
];
const HIGH_TR: &[&str] = &[
    "çalışmıyor", "bozuk", "hata", "erişemiyorum", "başarısız", "takıldı", "engellendi", "çöktü",
    "kayboldu", "silindi",
];

fn critical_category_weight(category: &str) -> Option<i32> {
    match category {
        "technical_issue" | "bug_report" => Some(1),
        "complaint" => Some(2),
        _ => None,
    }
}

fn low_priority_category_weight(category: &str) -> Option<i32> {
    match category {
        "feature_request" => Some(-1),
        "general_inquiry" => Some(0),
        _ => None,
    }
}

fn tier_boost(tier: &str) -> i32 {
    match tier.to_lowercase().as_str() {
        "enterprise" | "vip" => 2,
        "premium" => 1,
        "free" => -1,
        _ => 0,
    }
}

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)deadline|due date|by \w+ \d+|until|son tarih|tarihe kadar|süre").unwrap()
});
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\$\d+|€\d+|£\d+|\d+\s*(tl|lira|dolar|euro)|para|ücret|ödeme|fatura").unwrap()
});

fn analyze_text_patterns(text: &str) -> TextPatterns {
    if text.is_empty() {
        return TextPatterns {
            caps_ratio: 0.0,
            exclamation_count: 0,
            question_marks: 0,
            word_count: 0,
            has_deadline_mention: false,
            has_money_mention: false,
        };
    }

    let alpha_chars: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    let caps_ratio = if alpha_chars.is_empty() {
        0.0
    } else {
        alpha_chars.iter().filter(|c| c.is_uppercase()).count() as f64 / alpha_chars.len() as f64
    };

    TextPatterns {
        caps_ratio,
        exclamation_count: text.matches('!').count(),
        question_marks: text.matches('?').count(),
        word_count: text.split_whitespace().count(),
        has_deadline_mention: DEADLINE_RE.is_match(text),
        has_money_mention: MONEY_RE.is_match(text),
    }
}

fn find_keywords(text_lower: &str, en: &[&str], tr: &[&str]) -> Vec<String> {
    en.iter()
        .chain(tr.iter())
        .filter(|kw| text_lower.contains(**kw))
        .map(|kw| kw.to_string())
        .collect()
}

pub struct PriorityScorer {
    custom_rules: Vec<CustomPriorityRule>,
}

impl PriorityScorer {
    pub fn new(custom_rules: Vec<CustomPriorityRule>) -> Self {
        Self { custom_rules }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn calculate(
        &self,
        text: &str,
        sentiment: Option<Sentiment>,
        anger_level: Option<f64>,
        customer_tier: &str,
        category: Option<&str>,
        metadata: &std::collections::HashMap<String, String>,
    ) -> PriorityResult {
        const BASE_SCORE: i32 = 3;
        let mut factors: Vec<PriorityFactor> = Vec::new();
        let text_lower = text.to_lowercase();

        let urgent_found = find_keywords(&text_lower, URGENT_EN, URGENT_TR);
        if !urgent_found.is_empty() {
            factors.push(PriorityFactor {
                name: "urgent_keyword".to_string(),
                weight: 2,
                reason: format!("Urgent keywords detected: {}", urgent_found.iter().take(3).cloned().collect::<Vec<_>>().join(", ")),
            });
        }

        let high_found = find_keywords(&text_lower, HIGH_EN, HIGH_TR);
        if !high_found.is_empty() && urgent_found.is_empty() {
            factors.push(PriorityFactor {
                name: "high_priority_keyword".to_string(),
                weight: 1,
                reason: format!("High priority keywords: {}", high_found.iter().take(3).cloned().collect::<Vec<_>>().join(", ")),
            });
        }

        if let Some(sentiment) = sentiment {
            match sentiment {
                Sentiment::Negative => factors.push(PriorityFactor {
                    name: "sentiment_negative".to_string(),
                    weight: 1,
                    reason: "Customer sentiment is negative".to_string(),
                }),
                Sentiment::Angry => factors.push(PriorityFactor {
                    name: "sentiment_angry".to_string(),
                    weight: 2,
                    reason: "Customer sentiment is angry".to_string(),
                }),
                _ => {}
            }
        }

        if anger_level.unwrap_or(0.0) >= 0.7 {
            factors.push(PriorityFactor {
                name: "high_anger".to_string(),
                weight: 1,
                reason: format!("High anger level detected ({:.2})", anger_level.unwrap_or(0.0)),
            });
        }

        let tier_weight = tier_boost(customer_tier);
        if tier_weight != 0 {
            factors.push(PriorityFactor {
                name: format!("customer_tier_{customer_tier}"),
                weight: tier_weight,
                reason: format!("Customer tier: {customer_tier}"),
            });
        }

        if let Some(category) = category {
            if let Some(weight) = critical_category_weight(category) {
                factors.push(PriorityFactor {
                    name: format!("critical_category_{category}"),
                    weight,
                    reason: format!("Critical category: {category}"),
                });
            } else if let Some(weight) = low_priority_category_weight(category) {
                factors.push(PriorityFactor {
                    name: format!("low_priority_category_{category}"),
                    weight,
                    reason: format!("Low priority category: {category}"),
                });
            }
        }

        let patterns = analyze_text_patterns(text);
        if patterns.caps_ratio > 0.5 {
            factors.push(PriorityFactor {
                name: "excessive_caps".to_string(),
                weight: 1,
                reason: "Excessive use of capital letters".to_string(),
            });
        }
        if patterns.exclamation_count >= 3 {
            factors.push(PriorityFactor {
                name: "multiple_exclamations".to_string(),
                weight: 1,
                reason: format!("Multiple exclamation marks ({})", patterns.exclamation_count),
            });
        }
        if patterns.has_deadline_mention {
            factors.push(PriorityFactor {
                name: "deadline_mention".to_string(),
                weight: 1,
                reason: "Deadline mentioned in text".to_string(),
            });
        }

        for rule in &self.custom_rules {
            match rule {
                CustomPriorityRule::Keyword { name, keywords, weight, description } => {
                    if keywords.iter().any(|kw| text_lower.contains(&kw.to_lowercase())) {
                        factors.push(PriorityFactor { name: name.clone(), weight: *weight, reason: description.clone() });
                    }
                }
                CustomPriorityRule::CustomerField { name, field, value, weight, description } => {
                    if metadata.get(field).map(|v| v == value).unwrap_or(false) {
                        factors.push(PriorityFactor { name: name.clone(), weight: *weight, reason: description.clone() });
                    }
                }
            }
        }

        let total_weight: i32 = factors.iter().map(|f| f.weight).sum();
        let final_score = (BASE_SCORE + total_weight).clamp(1, 5) as u8;

        PriorityResult {
            score: final_score,
            level: PriorityLevel::from_score(final_score),
            factors,
            breakdown: PriorityBreakdown {
                base_score: BASE_SCORE,
                total_adjustment: total_weight,
                final_score,
                text_patterns: patterns,
            },
        }
    }

    /// Shifts the current score by one level in `direction` and clamps.
    pub fn recalculate_with_override(
        &self,
        current_score: u8,
        override_reasons: Vec<String>,
        direction: OverrideDirection,
    ) -> PriorityResult {
        let adjustment: i32 = match direction {
            OverrideDirection::Up => 1,
            OverrideDirection::Down => -1,
        };
        let new_score = (current_score as i32 + adjustment).clamp(1, 5) as u8;

        PriorityResult {
            score: new_score,
            level: PriorityLevel::from_score(new_score),
            factors: override_reasons
                .into_iter()
                .map(|reason| PriorityFactor { name: "manual_override".to_string(), weight: adjustment, reason })
                .collect(),
            breakdown: PriorityBreakdown {
                base_score: current_score as i32,
                total_adjustment: adjustment,
                final_score: new_score,
                text_patterns: analyze_text_patterns(""),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum OverrideDirection {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scorer() -> PriorityScorer {
        PriorityScorer::new(Vec::new())
    }

    #[test]
    fn base_score_with_no_factors_is_medium() {
        let result = scorer().calculate("just a regular question", None, None, "standard", None, &HashMap::new());
        assert_eq!(result.score, 3);
        assert_eq!(result.level, PriorityLevel::Medium);
    }

    #[test]
    fn urgent_keyword_and_vip_tier_raise_priority_to_max() {
        let result = scorer().calculate(
            "This is urgent, the system is down!",
            Some(Sentiment::Angry),
            Some(0.9),
            "vip",
            Some("technical_issue"),
            &HashMap::new(),
        );
        assert_eq!(result.score, 5);
        assert_eq!(result.level, PriorityLevel::Critical);
    }

    #[test]
    fn feature_request_from_free_tier_drops_below_base() {
        let result = scorer().calculate(
            "would be nice to have dark mode",
            None,
            None,
            "free",
            Some("feature_request"),
            &HashMap::new(),
        );
        assert_eq!(result.score, 1);
    }

    #[test]
    fn custom_customer_field_rule_applies_as_boost() {
        let rule = CustomPriorityRule::CustomerField {
            name: "category_priority_boost".to_string(),
            field: "category_priority_boost".to_string(),
            value: "2".to_string(),
            weight: 2,
            description: "Category priority boost".to_string(),
        };
        let mut metadata = HashMap::new();
        metadata.insert("category_priority_boost".to_string(), "2".to_string());

        let result = PriorityScorer::new(vec![rule]).calculate("a ticket", None, None, "standard", None, &metadata);
        assert_eq!(result.score, 5);
    }

    #[test]
    fn recalculate_with_override_shifts_by_one() {
        let result = scorer().recalculate_with_override(3, vec!["manager request".to_string()], OverrideDirection::Up);
        assert_eq!(result.score, 4);
    }
}
