use serde::{Deserialize, Serialize};

/// One provider's answer to a prompt. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub provider_name: String,
    pub text: String,
    pub model_name: String,
}

impl CandidateResponse {
    pub fn new(provider_name: impl Into<String>, text: &str, model_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            text: text.trim().to_string(),
            model_name: model_name.into(),
        }
    }
}

/// Evaluation result for one candidate. `candidate_id` is the index into the
/// input list and stays stable across the whole evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate_id: usize,
    pub final_score: f32,
    pub evidence_score: f32,
    pub consensus_score: f32,
    pub sentiment_score: f32,
    pub response: CandidateResponse,
    pub evidence_snippets: Vec<String>,
}

/// Output of one evaluation run. `all_candidates` keeps input order, unsorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub winner: Option<ScoredCandidate>,
    pub explainability: String,
    pub all_candidates: Vec<ScoredCandidate>,
}

impl EvaluationResult {
    pub fn empty(message: &str) -> Self {
        Self {
            winner: None,
            explainability: message.to_string(),
            all_candidates: Vec::new(),
        }
    }
}
