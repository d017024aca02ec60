use crate::config::EvalConfig;
use crate::consensus::consensus_score;
use crate::embedding::Embedder;
use crate::evidence::EvidenceRetriever;
use crate::sentiment::{SentimentClassifier, SentimentScorer};
use crate::types::{CandidateResponse, EvaluationResult, ScoredCandidate};
use crate::wiki::EvidenceSource;
use futures::{stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scores every candidate on evidence support, pool consensus, and clarity,
/// then picks the winner by weighted score.
pub struct Evaluator {
    cfg: EvalConfig,
    embedder: Arc<dyn Embedder>,
    retriever: EvidenceRetriever,
    sentiment: SentimentScorer,
}

impl Evaluator {
    pub fn new(
        cfg: EvalConfig,
        embedder: Arc<dyn Embedder>,
        source: Arc<dyn EvidenceSource>,
        classifier: Arc<dyn SentimentClassifier>,
    ) -> Self {
        let retriever = EvidenceRetriever::new(source, embedder.clone(), cfg.clone());
        let sentiment = SentimentScorer::new(classifier, cfg.sentiment_max_chars);
        Self { cfg, embedder, retriever, sentiment }
    }

    pub async fn evaluate(
        &self,
        prompt: &str,
        candidates: &[CandidateResponse],
    ) -> EvaluationResult {
        if candidates.is_empty() {
            return EvaluationResult::empty("No responses to evaluate");
        }
        info!(
            prompt = %prompt.chars().take(50).collect::<String>(),
            count = candidates.len(),
            "evaluating candidates"
        );

        // One batch call up front; a failed batch degrades every consensus
        // score to zero instead of aborting the evaluation.
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embeddings = match self.embedder.embed_many(&texts).await {
            Ok(e) if e.len() == candidates.len() => e,
            Ok(e) => {
                warn!(got = e.len(), want = candidates.len(), "embedding batch misaligned");
                vec![Vec::new(); candidates.len()]
            }
            Err(err) => {
                warn!(error = %err, "embedding batch failed");
                vec![Vec::new(); candidates.len()]
            }
        };

        let weights = self.cfg.weights;
        let tasks = candidates.iter().cloned().enumerate().map(|(i, candidate)| {
            let embeddings = &embeddings;
            async move {
                let (evidence_snippets, evidence_score) = if self.cfg.per_claim_evidence {
                    self.retriever.score_per_claim(&candidate.text).await
                } else {
                    self.retriever.get_evidence_and_score(&candidate.text).await
                };
                let sentiment_score = self.sentiment.clarity_score(&candidate.text).await;
                let consensus = consensus_score(i, embeddings);
                let final_score = evidence_score * weights.evidence
                    + consensus * weights.consensus
                    + sentiment_score * weights.clarity;
                debug!(
                    candidate = i,
                    evidence = evidence_score,
                    consensus = consensus,
                    clarity = sentiment_score,
                    total = final_score,
                    "candidate scored"
                );
                ScoredCandidate {
                    candidate_id: i,
                    final_score,
                    evidence_score,
                    consensus_score: consensus,
                    sentiment_score,
                    response: candidate.clone(),
                    evidence_snippets,
                }
            }
        });

        let mut all_candidates = stream::iter(tasks)
            .buffer_unordered(self.cfg.score_concurrency)
            .collect::<Vec<_>>()
            .await;
        all_candidates.sort_by_key(|c| c.candidate_id);

        if all_candidates.is_empty() {
            return EvaluationResult::empty("No candidates could be scored");
        }

        // Strict comparison so ties go to the earliest candidate.
        let mut winner = &all_candidates[0];
        for candidate in &all_candidates[1..] {
            if candidate.final_score > winner.final_score {
                winner = candidate;
            }
        }

        let explainability = format!(
            "Selected {} (score: {:.2}). Evidence: {:.2}, Consensus: {:.2}, Clarity: {:.2}",
            winner.response.provider_name,
            winner.final_score,
            winner.evidence_score,
            winner.consensus_score,
            winner.sentiment_score
        );

        EvaluationResult {
            winner: Some(winner.clone()),
            explainability,
            all_candidates,
        }
    }
}
