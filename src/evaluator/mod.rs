// PromptShelf — Prompt quality evaluation
//
// Scores prompt text through a language model. Callers never see an error:
// failures and timeouts degrade to a fixed fallback score.

use crate::provider::{Completion, LLMProvider, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of improvement suggestions kept per score.
pub const MAX_SUGGESTIONS: usize = 2;

const FALLBACK_SUGGESTIONS: [&str; 2] = [
    "Evaluation is unavailable right now, try again later.",
    "Add concrete context and the expected output format.",
];

const EVALUATION_INSTRUCTIONS: &str = r#"You review prompts written for AI coding assistants.
Rate the prompt you are given and answer with a single JSON object, no prose:
{"overallScore": 0-100, "clarity": 0-10, "specificity": 0-10, "context": 0-10,
 "efficiency": 0-10, "relevance": 0-10, "suggestions": ["at most two short suggestions"]}"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptScore {
    pub overall_score: u8,
    pub clarity: u8,
    pub specificity: u8,
    pub context: u8,
    pub efficiency: u8,
    pub relevance: u8,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl PromptScore {
    /// The score attached when the evaluator fails or times out.
    pub fn fallback() -> Self {
        Self {
            overall_score: 50,
            clarity: 5,
            specificity: 5,
            context: 5,
            efficiency: 5,
            relevance: 5,
            suggestions: FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.suggestions
            .first()
            .is_some_and(|s| s == FALLBACK_SUGGESTIONS[0])
    }

    /// Short annotation shown next to tree items, e.g. `82 good`.
    pub fn badge(&self) -> String {
        let word = match self.overall_score {
            80..=100 => "excellent",
            60..=79 => "good",
            40..=59 => "fair",
            _ => "needs work",
        };
        format!("{} {}", self.overall_score, word)
    }
}

/// Loosely typed model output, clamped into a `PromptScore`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScore {
    overall_score: Option<f64>,
    clarity: Option<f64>,
    specificity: Option<f64>,
    context: Option<f64>,
    efficiency: Option<f64>,
    relevance: Option<f64>,
    #[serde(default)]
    suggestions: Vec<String>,
}

fn clamp(v: Option<f64>, max: f64) -> u8 {
    v.unwrap_or(0.0).round().clamp(0.0, max) as u8
}

impl From<RawScore> for PromptScore {
    fn from(raw: RawScore) -> Self {
        Self {
            overall_score: clamp(raw.overall_score, 100.0),
            clarity: clamp(raw.clarity, 10.0),
            specificity: clamp(raw.specificity, 10.0),
            context: clamp(raw.context, 10.0),
            efficiency: clamp(raw.efficiency, 10.0),
            relevance: clamp(raw.relevance, 10.0),
            suggestions: raw
                .suggestions
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(MAX_SUGGESTIONS)
                .collect(),
            timestamp: Utc::now(),
        }
    }
}

/// Extract the score object from a model reply, tolerating code fences and prose.
pub fn parse_score(reply: &str) -> anyhow::Result<PromptScore> {
    let start = reply
        .find('{')
        .ok_or_else(|| anyhow::anyhow!("no JSON object in evaluator reply"))?;
    let end = reply
        .rfind('}')
        .filter(|e| *e > start)
        .ok_or_else(|| anyhow::anyhow!("unterminated JSON object in evaluator reply"))?;
    let raw: RawScore = serde_json::from_str(&reply[start..=end])?;
    if raw.overall_score.is_none() {
        anyhow::bail!("evaluator reply has no overallScore");
    }
    Ok(raw.into())
}

// ---------------------------------------------------------------------------
// Evaluator trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, text: &str) -> anyhow::Result<PromptScore>;
}

/// Evaluator backed by a chat-completions provider.
pub struct LlmEvaluator {
    provider: Arc<dyn LLMProvider>,
}

impl LlmEvaluator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, text: &str) -> anyhow::Result<PromptScore> {
        let request = Completion {
            messages: vec![
                Message::system(EVALUATION_INSTRUCTIONS),
                Message::user(format!("Prompt to evaluate:\n\n{}", text)),
            ],
            temperature: 0.2,
            json_reply: true,
        };
        let reply = self.provider.complete(&request).await?;
        tracing::debug!(model = %self.provider.model(), reply_len = reply.len(), "Evaluator replied");
        parse_score(&reply)
    }
}

/// Run the evaluator with a time bound. Never fails.
pub async fn evaluate_or_fallback(
    evaluator: &dyn Evaluator,
    text: &str,
    timeout: Duration,
) -> PromptScore {
    match tokio::time::timeout(timeout, evaluator.evaluate(text)).await {
        Ok(Ok(score)) => {
            tracing::debug!(score = score.overall_score, "Prompt evaluated");
            score
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Prompt evaluation failed, using fallback score");
            PromptScore::fallback()
        }
        Err(_) => {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Prompt evaluation timed out, using fallback score"
            );
            PromptScore::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowEvaluator;

    #[async_trait]
    impl Evaluator for SlowEvaluator {
        async fn evaluate(&self, _text: &str) -> anyhow::Result<PromptScore> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(PromptScore::fallback())
        }
    }

    struct FailingEvaluator;

    #[async_trait]
    impl Evaluator for FailingEvaluator {
        async fn evaluate(&self, _text: &str) -> anyhow::Result<PromptScore> {
            anyhow::bail!("service down")
        }
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"overallScore\": 87.6, \"clarity\": 12, \"specificity\": 7, \
                     \"context\": -1, \"efficiency\": 8, \"relevance\": 9, \
                     \"suggestions\": [\"a\", \"b\", \"c\"]}\n```";
        let score = parse_score(reply).unwrap();
        assert_eq!(score.overall_score, 88);
        assert_eq!(score.clarity, 10);
        assert_eq!(score.context, 0);
        assert_eq!(score.suggestions, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_score("I think this prompt is fine").is_err());
        assert!(parse_score("{\"clarity\": 3}").is_err());
    }

    #[test]
    fn test_badge() {
        let mut s = PromptScore::fallback();
        assert_eq!(s.badge(), "50 fair");
        s.overall_score = 91;
        assert_eq!(s.badge(), "91 excellent");
    }

    #[tokio::test]
    async fn test_timeout_uses_fallback() {
        let score =
            evaluate_or_fallback(&SlowEvaluator, "text", Duration::from_millis(20)).await;
        assert!(score.is_fallback());
        assert_eq!(score.overall_score, 50);
    }

    #[tokio::test]
    async fn test_error_uses_fallback() {
        let score =
            evaluate_or_fallback(&FailingEvaluator, "text", Duration::from_secs(1)).await;
        assert!(score.is_fallback());
        assert_eq!(score.suggestions.len(), MAX_SUGGESTIONS);
    }
}
