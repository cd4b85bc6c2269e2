//! Sentiment analysis: label, score, anger level and a satisfaction
//! prediction, with an AI path and a lexicon-based fallback.
//!
//! Grounded on `original_source/src/services/sentiment.py`'s
//! `SentimentAnalyzer`. The fallback anger-level formula follows the
//! `_detect_anger` helper (keyword count + caps ratio + exclamation count)
//! rather than `_analyze_with_rules`'s simpler `angry_count * 0.25` --
//! the richer formula is what the source's own post-rule override assumes
//! and is the one spelled out explicitly by this service's own spec.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::llm::{retry_with_backoff, ChatProvider, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Angry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentMethod {
    Ai,
    RuleBased,
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub score: f64,
    pub confidence: f64,
    pub anger_level: f64,
    pub satisfaction_prediction: u8,
    pub key_phrases: Vec<String>,
    pub reasoning: String,
    pub method: SentimentMethod,
}

#[derive(Debug, Deserialize)]
struct AiResponse {
    sentiment: String,
    score: f64,
    #[serde(default = "default_confidence")]
    confidence: f64,
    anger_level: f64,
    satisfaction_prediction: u8,
    #[serde(default)]
    key_phrases: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

fn default_confidence() -> f64 {
    0.5
}

const POSITIVE_TR: &[&str] = &[
    "teşekkür", "memnun", "harika", "güzel", "mükemmel", "süper", "çok iyi", "başarılı", "mutlu",
    "sevindim", "beğendim", "muhteşem",
];
const NEGATIVE_TR: &[&str] = &[
    "sorun", "problem", "hata", "kötü", "berbat", "rezalet", "memnuniyetsiz", "mutsuz",
    "hayal kırıklığı", "üzgün", "kızgın",
];
const ANGRY_TR: &[&str] = &[
    "rezalet", "skandal", "kabul edilemez", "saçmalık", "utanç", "inanılmaz", "dava", "şikayet",
    "berbat", "felaket", "çok kızgın",
];
const POSITIVE_EN: &[&str] = &[
    "thank", "thanks", "great", "excellent", "wonderful", "happy", "satisfied", "love", "amazing",
    "perfect", "awesome",
];
const NEGATIVE_EN: &[&str] = &[
    "problem", "issue", "bad", "terrible", "awful", "disappointed", "unhappy", "frustrated",
    "annoyed", "upset", "wrong",
];
const ANGRY_EN: &[&str] = &[
    "unacceptable", "outrageous", "ridiculous", "furious", "lawsuit", "complaint", "worst",
    "hate", "disgusting", "horrible",
];

pub struct SentimentAnalyzer {
    chat: Option<Box<dyn ChatProvider>>,
    retry_policy: RetryPolicy,
}

impl SentimentAnalyzer {
    pub fn new(chat: Option<Box<dyn ChatProvider>>) -> Self {
        Self { chat, retry_policy: RetryPolicy::default() }
    }

    pub async fn analyze(&self, text: &str, language: &str) -> SentimentResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return SentimentResult {
                sentiment: Sentiment::Neutral,
                score: 0.0,
                confidence: 0.0,
                anger_level: 0.0,
                satisfaction_prediction: 3,
                key_phrases: Vec::new(),
                reasoning: "Empty text".to_string(),
                method: SentimentMethod::Default,
            };
        }

        let truncated = crate::text::truncate(trimmed, 2000, "");

        let mut result = if let Some(chat) = &self.chat {
            match self.analyze_with_ai(chat.as_ref(), &truncated, language).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(error = %err, "AI sentiment analysis failed, falling back to rules");
                    self.analyze_with_rules(&truncated, language)
                }
            }
        } else {
            self.analyze_with_rules(&truncated, language)
        };

        if result.anger_level >= 0.7 {
            result.sentiment = Sentiment::Angry;
        }

        result
    }

    async fn analyze_with_ai(
        &self,
        chat: &dyn ChatProvider,
        text: &str,
        _language: &str,
    ) -> Result<SentimentResult> {
        let system_prompt = "You are a customer-sentiment analysis expert. Respond with JSON: sentiment (positive|neutral|negative|angry), score (-1..1), confidence (0..1), anger_level (0..1), satisfaction_prediction (1..5), key_phrases, reasoning.";
        let user_prompt = format!("Analyze the following customer message:\n---\n{text}\n---");

        let raw = retry_with_backoff(self.retry_policy, || async {
            chat.complete(system_prompt, &user_prompt).await
        })
        .await?;

        let parsed: AiResponse = serde_json::from_str(&raw)
            .map_err(|e| crate::error::AppError::dependency("llm_sentiment_parse", e))?;

        let sentiment = parse_sentiment(&parsed.sentiment).unwrap_or(Sentiment::Neutral);

        Ok(SentimentResult {
            sentiment,
            score: parsed.score,
            confidence: parsed.confidence,
            anger_level: parsed.anger_level,
            satisfaction_prediction: parsed.satisfaction_prediction.clamp(1, 5),
            key_phrases: parsed.key_phrases,
            reasoning: parsed.reasoning,
            method: SentimentMethod::Ai,
        })
    }

    fn analyze_with_rules(&self, text: &str, language: &str) -> SentimentResult {
        let text_lower = text.to_lowercase();
        let (positive_words, negative_words, angry_words) = if language == "tr" {
            (POSITIVE_TR, NEGATIVE_TR, ANGRY_TR)
        } else {
            (POSITIVE_EN, NEGATIVE_EN, ANGRY_EN)
        };

        let positive_count = positive_words.iter().filter(|w| text_lower.contains(**w)).count() as f64;
        let negative_count = negative_words.iter().filter(|w| text_lower.contains(**w)).count() as f64;
        let angry_count = angry_words.iter().filter(|w| text_lower.contains(**w)).count() as f64;

        let total = positive_count + negative_count + 1.0;
        let score = ((positive_count - negative_count) / total).clamp(-1.0, 1.0);

        let caps_ratio = if text.is_empty() {
            0.0
        } else {
            text.chars().filter(|c| c.is_uppercase()).count() as f64 / text.chars().count() as f64
        };
        let exclamation_count = text.matches('!').count() as f64;
        let anger_level = (angry_count * 0.2 + caps_ratio * 0.5 + exclamation_count * 0.1).min(1.0);

        let sentiment = if anger_level >= 0.7 {
            Sentiment::Angry
        } else if score > 0.2 {
            Sentiment::Positive
        } else if score < -0.2 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        };

        let satisfaction = match sentiment {
            Sentiment::Positive => 4.0 + score * 0.5,
            Sentiment::Angry => 1.0,
            Sentiment::Negative => 2.0 + score * 0.5,
            Sentiment::Neutral => 3.0,
        };

        SentimentResult {
            sentiment,
            score: round3(score),
            confidence: 0.6,
            anger_level: round3(anger_level),
            satisfaction_prediction: satisfaction.clamp(1.0, 5.0).round() as u8,
            key_phrases: Vec::new(),
            reasoning: "Rule-based analysis".to_string(),
            method: SentimentMethod::RuleBased,
        }
    }
}

fn parse_sentiment(raw: &str) -> Option<Sentiment> {
    match raw {
        "positive" => Some(Sentiment::Positive),
        "neutral" => Some(Sentiment::Neutral),
        "negative" => Some(Sentiment::Negative),
        "angry" => Some(Sentiment::Angry),
        _ => None,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_text_is_neutral_default() {
        let analyzer = SentimentAnalyzer::new(None);
        let result = analyzer.analyze("", "en").await;
        assert_eq!(result.sentiment, Sentiment::Neutral);
        assert_eq!(result.method, SentimentMethod::Default);
    }

    #[tokio::test]
    async fn angry_words_and_caps_drive_anger_level_and_override_sentiment() {
        let analyzer = SentimentAnalyzer::new(None);
        let result = analyzer
            .analyze("THIS IS UNACCEPTABLE AND OUTRAGEOUS!!!", "en")
            .await;
        assert_eq!(result.sentiment, Sentiment::Angry);
        assert!(result.anger_level >= 0.7);
    }

    #[tokio::test]
    async fn positive_words_yield_positive_sentiment() {
        let analyzer = SentimentAnalyzer::new(None);
        let result = analyzer.analyze("Thank you so much, this was great and amazing", "en").await;
        assert_eq!(result.sentiment, Sentiment::Positive);
    }
}
