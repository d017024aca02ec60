use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct Sentiment {
    pub label: SentimentLabel,
    pub confidence: f32,
}

#[async_trait::async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment>;
}

/// Map a classification onto the [0,1] clarity scale: confident-positive
/// reads as clear, confident-negative as unclear, anything else as neutral.
pub fn clarity_from(sentiment: &Sentiment) -> f32 {
    match sentiment.label {
        SentimentLabel::Positive => sentiment.confidence,
        SentimentLabel::Negative => 1.0 - sentiment.confidence,
        _ => 0.5,
    }
}

/// Clarity scoring over a classifier collaborator. Blank text and classifier
/// failures both land on neutral 0.5; failures are logged first.
pub struct SentimentScorer {
    classifier: Arc<dyn SentimentClassifier>,
    max_chars: usize,
}

impl SentimentScorer {
    pub fn new(classifier: Arc<dyn SentimentClassifier>, max_chars: usize) -> Self {
        Self { classifier, max_chars }
    }

    pub async fn clarity_score(&self, text: &str) -> f32 {
        if text.trim().is_empty() {
            return 0.5;
        }
        // Hosted classifiers reject long inputs; cut on a char boundary.
        let truncated: String = text.chars().take(self.max_chars).collect();
        match self.classifier.classify(&truncated).await {
            Ok(sentiment) => clarity_from(&sentiment),
            Err(err) => {
                warn!(error = %err, "sentiment classification failed");
                clarity_from(&Sentiment { label: SentimentLabel::Error, confidence: 0.0 })
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct InferenceLabel {
    label: String,
    score: f32,
}

/// Hosted text-classification endpoint (HuggingFace inference API shape).
pub struct HttpSentimentClassifier {
    http: Client,
    endpoint: String,
    token: Option<String>,
}

const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/distilbert-base-uncased-finetuned-sst-2-english";

impl HttpSentimentClassifier {
    pub fn new(endpoint: impl Into<String>, token: Option<String>, timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self { http, endpoint: endpoint.into(), token })
    }

    pub fn from_env() -> Result<Self> {
        let endpoint =
            std::env::var("SENTIMENT_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Self::new(endpoint, std::env::var("HF_API_TOKEN").ok(), 10_000)
    }
}

#[async_trait::async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment> {
        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let raw: Vec<Vec<InferenceLabel>> =
            req.send().await?.error_for_status()?.json().await?;

        let best = raw
            .into_iter()
            .flatten()
            .max_by(|a, b| a.score.total_cmp(&b.score));
        Ok(match best {
            Some(l) => {
                let label = match l.label.as_str() {
                    "POSITIVE" => SentimentLabel::Positive,
                    "NEGATIVE" => SentimentLabel::Negative,
                    _ => SentimentLabel::Neutral,
                };
                Sentiment { label, confidence: l.score.clamp(0.0, 1.0) }
            }
            None => Sentiment { label: SentimentLabel::Error, confidence: 0.0 },
        })
    }
}
