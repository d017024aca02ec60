/// Weights for the final score. Conventionally sum to 1 but nothing enforces
/// it; the evaluator only computes the weighted sum.
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub evidence: f32,
    pub consensus: f32,
    pub clarity: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { evidence: 0.5, consensus: 0.3, clarity: 0.2 }
    }
}

/// Tunables for one evaluation pipeline, fixed at construction.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub weights: ScoringWeights,
    /// Cosine similarity a snippet must reach to count as support.
    pub similarity_threshold: f32,
    /// How many search results to consider per evidence query.
    pub search_results: usize,
    /// How many sentences of each summary to keep.
    pub summary_sentences: usize,
    /// Classifier input is cut to this many chars.
    pub sentiment_max_chars: usize,
    /// Evidence-score each extracted claim instead of the whole response.
    pub per_claim_evidence: bool,
    /// How many candidates are scored concurrently.
    pub score_concurrency: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            similarity_threshold: 0.60,
            search_results: 3,
            summary_sentences: 5,
            sentiment_max_chars: 512,
            per_claim_evidence: false,
            score_concurrency: 4,
        }
    }
}
