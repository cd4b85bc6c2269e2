//! Ticket category classification.
//!
//! Grounded on `original_source/src/services/classifier.py`'s
//! `TicketClassifier`: cache lookup, then an AI call with a
//! category-enumerating system prompt, then a keyword-scoring rule-based
//! fallback when the AI path is unavailable or exhausts its retries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::ClassifierCache;
use crate::error::Result;
use crate::llm::{retry_with_backoff, ChatProvider, RetryPolicy};

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "technical_issue",
    "billing_question",
    "feature_request",
    "bug_report",
    "account_management",
    "return_refund",
    "general_inquiry",
    "complaint",
];

fn category_description(category: &str, language: &str) -> &'static str {
    let (en, tr) = match category {
        "technical_issue" => (
            "Technical problems, system errors, and functionality issues",
            "Teknik sorunlar, sistem hataları ve işlevsellik sorunları",
        ),
        "billing_question" => (
            "Payment, invoice, pricing, and billing inquiries",
            "Ödeme, fatura, fiyatlandırma ve faturalandırma soruları",
        ),
        "feature_request" => (
            "Suggestions for new features or improvements",
            "Yeni özellik veya iyileştirme önerileri",
        ),
        "bug_report" => (
            "Software bugs, defects, and unexpected behavior reports",
            "Yazılım hataları, kusurlar ve beklenmedik davranış raporları",
        ),
        "account_management" => (
            "Account settings, password, login, and profile issues",
            "Hesap ayarları, şifre, giriş ve profil sorunları",
        ),
        "return_refund" => (
            "Product returns, refunds, and exchange requests",
            "Ürün iadesi, geri ödeme ve değişim talepleri",
        ),
        "general_inquiry" => (
            "General questions and information requests",
            "Genel sorular ve bilgi talepleri",
        ),
        "complaint" => (
            "Customer complaints and negative feedback",
            "Müşteri şikayetleri ve olumsuz geri bildirimler",
        ),
        _ => ("", ""),
    };
    if language == "tr" {
        tr
    } else {
        en
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Ai,
    AiCached,
    RuleBased,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub primary_category: String,
    pub confidence: f64,
    pub all_categories: HashMap<String, f64>,
    pub secondary_categories: Vec<String>,
    pub reasoning: String,
    pub method: ClassificationMethod,
}

/// The subset of an AI response this classifier actually parses; extra
/// fields the model returns (emotional_state, risk_level, ...) are ignored.
#[derive(Debug, Deserialize)]
struct AiResponse {
    primary_category: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    all_categories: HashMap<String, f64>,
    #[serde(default)]
    secondary_categories: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

pub struct Classifier {
    categories: Vec<String>,
    cache: Option<ClassifierCache>,
    chat: Option<Box<dyn ChatProvider>>,
    retry_policy: RetryPolicy,
}

impl Classifier {
    pub fn new(
        categories: Vec<String>,
        cache: Option<ClassifierCache>,
        chat: Option<Box<dyn ChatProvider>>,
    ) -> Self {
        Self { categories, cache, chat, retry_policy: RetryPolicy::default() }
    }

    pub async fn classify(&self, text: &str, language: &str, use_cache: bool) -> Classification {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Classification {
                primary_category: "general_inquiry".to_string(),
                confidence: 0.0,
                all_categories: [("general_inquiry".to_string(), 1.0)].into_iter().collect(),
                secondary_categories: Vec::new(),
                reasoning: "Empty ticket content".to_string(),
                method: ClassificationMethod::Default,
            };
        }

        let truncated = crate::text::truncate(trimmed, 5000, "");
        let cache_key = blake3::hash(truncated.as_bytes()).to_hex().to_string();

        if use_cache {
            if let Some(cache) = &self.cache {
                if let Some(mut cached) = cache.get(&cache_key).await {
                    cached.method = ClassificationMethod::AiCached;
                    return cached;
                }
            }
        }

        if let Some(chat) = &self.chat {
            match self.classify_with_ai(chat.as_ref(), &truncated, language).await {
                Ok(result) => {
                    if use_cache {
                        if let Some(cache) = &self.cache {
                            cache.put(&cache_key, result.clone()).await;
                        }
                    }
                    return result;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "AI classification failed, falling back to rule-based");
                }
            }
        }

        self.rule_based_fallback(&truncated)
    }

    async fn classify_with_ai(
        &self,
        chat: &dyn ChatProvider,
        text: &str,
        language: &str,
    ) -> Result<Classification> {
        let system_prompt = self.build_system_prompt(language);
        let user_prompt = build_user_prompt(text);

        let raw = retry_with_backoff(self.retry_policy, || async {
            chat.complete(&system_prompt, &user_prompt).await
        })
        .await?;

        let parsed: AiResponse = serde_json::from_str(&raw)
            .map_err(|e| crate::error::AppError::dependency("llm_classify_parse", e))?;

        let primary_category = if self.categories.iter().any(|c| c == &parsed.primary_category) {
            parsed.primary_category
        } else {
            tracing::warn!(category = %parsed.primary_category, "AI returned unknown category");
            "general_inquiry".to_string()
        };

        Ok(Classification {
            primary_category,
            confidence: parsed.confidence,
            all_categories: parsed.all_categories,
            secondary_categories: parsed.secondary_categories,
            reasoning: parsed.reasoning,
            method: ClassificationMethod::Ai,
        })
    }

    fn build_system_prompt(&self, language: &str) -> String {
        let category_list: Vec<String> = self
            .categories
            .iter()
            .map(|c| format!("- {c}: {}", category_description(c, language)))
            .collect();
        format!(
            "You are an experienced customer support analyst. Categorize the ticket into exactly one of:\n{}\nRespond with JSON: primary_category, confidence (0-1), all_categories (map), secondary_categories (list), reasoning.",
            category_list.join("\n")
        )
    }

    fn rule_based_fallback(&self, text: &str) -> Classification {
        let text_lower = text.to_lowercase();
        let keyword_map: &[(&str, &[&str])] = &[
            ("technical_issue", &["error", "failure", "not working", "broken", "crash", "bug", "issue", "problem", "glitch", "defective"]),
            ("billing_question", &["invoice", "payment", "charge", "price", "cost", "bill", "receipt", "subscription", "fee", "refund"]),
            ("feature_request", &["feature", "suggestion", "add", "request", "improve", "enhancement", "idea", "would be nice"]),
            ("bug_report", &["bug", "defect", "flaw", "wrong", "unexpected", "error", "glitch", "malfunction"]),
            ("account_management", &["account", "password", "login", "profile", "access", "register", "signup", "signin", "auth"]),
            ("return_refund", &["return", "refund", "exchange", "cancel", "money back", "reimbursement"]),
            ("complaint", &["complaint", "unhappy", "terrible", "bad", "worst", "disappointed", "awful", "horrible", "upset", "angry"]),
        ];

        // Ordered the way the keyword map (then "general_inquiry") enumerates
        // them, so a tie keeps the earliest category rather than whichever
        // one happens to sort last alphabetically.
        let mut scores: Vec<(String, f64)> = keyword_map
            .iter()
            .map(|(category, keywords)| {
                let matches = keywords.iter().filter(|kw| text_lower.contains(**kw)).count();
                (category.to_string(), (matches as f64 * 0.2).min(0.9))
            })
            .collect();
        scores.push(("general_inquiry".to_string(), 0.3));

        let (best_category, best_score) = scores
            .iter()
            .fold(None, |best: Option<&(String, f64)>, entry| match best {
                Some(current) if current.1 >= entry.1 => best,
                _ => Some(entry),
            })
            .map(|(k, v)| (k.clone(), *v))
            .unwrap_or(("general_inquiry".to_string(), 0.3));

        let total: f64 = scores.iter().map(|(_, v)| v).sum::<f64>().max(f64::MIN_POSITIVE);
        let normalized: HashMap<String, f64> =
            scores.iter().map(|(k, v)| (k.clone(), (v / total * 1000.0).round() / 1000.0)).collect();

        Classification {
            primary_category: best_category,
            confidence: (best_score * 1000.0).round() / 1000.0,
            all_categories: normalized,
            secondary_categories: Vec::new(),
            reasoning: "Rule-based classification (AI fallback)".to_string(),
            method: ClassificationMethod::RuleBased,
        }
    }
}

fn build_user_prompt(text: &str) -> String {
    format!("Analyze the following customer support request:\n---\n{text}\n---\nRespond in JSON as instructed.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(), None, None)
    }

    #[tokio::test]
    async fn empty_text_returns_default_general_inquiry() {
        let result = classifier().classify("", "en", true).await;
        assert_eq!(result.primary_category, "general_inquiry");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.method, ClassificationMethod::Default);
    }

    #[tokio::test]
    async fn rule_based_fallback_picks_billing_keywords() {
        let result = classifier()
            .classify("I was charged twice on my invoice, please refund the payment", "en", true)
            .await;
        assert_eq!(result.primary_category, "billing_question");
        assert_eq!(result.method, ClassificationMethod::RuleBased);
    }

    #[tokio::test]
    async fn rule_based_fallback_defaults_to_general_inquiry_with_no_keyword_hits() {
        let result = classifier().classify("Just saying hello there", "en", true).await;
        assert_eq!(result.primary_category, "general_inquiry");
    }
}
