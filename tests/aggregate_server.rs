use anyhow::Result;
use axum::body::Body;
use http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use quorum_rs::embedding::Embedder;
use quorum_rs::history::HistoryStore;
use quorum_rs::providers::CandidateSource;
use quorum_rs::sentiment::{Sentiment, SentimentClassifier, SentimentLabel};
use quorum_rs::server::{router, Engine};
use quorum_rs::wiki::EvidenceSource;
use quorum_rs::{CandidateResponse, EvalConfig, Evaluator};

struct FakeProviders {
    answers: Vec<(&'static str, &'static str)>,
}

#[async_trait::async_trait]
impl CandidateSource for FakeProviders {
    async fn get_candidates(&self, _prompt: &str) -> Result<Vec<CandidateResponse>> {
        Ok(self
            .answers
            .iter()
            .map(|(provider, text)| CandidateResponse::new(*provider, text, "model-x"))
            .collect())
    }
}

struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

#[async_trait::async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 1.0]))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed_one(t).await?);
        }
        Ok(out)
    }
}

struct FakeEvidence {
    summary: &'static str,
}

#[async_trait::async_trait]
impl EvidenceSource for FakeEvidence {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<String>> {
        Ok(vec!["Canberra".to_string()])
    }

    async fn fetch_summary(&self, _title: &str, _max_sentences: usize) -> Result<Option<String>> {
        Ok(Some(self.summary.to_string()))
    }
}

struct FakeSentiment;

#[async_trait::async_trait]
impl SentimentClassifier for FakeSentiment {
    async fn classify(&self, _text: &str) -> Result<Sentiment> {
        Ok(Sentiment { label: SentimentLabel::Positive, confidence: 0.9 })
    }
}

fn test_engine(answers: Vec<(&'static str, &'static str)>) -> (Arc<Engine>, Arc<HistoryStore>) {
    let grounded = "Canberra is the capital of Australia.";
    let summary = "Canberra is the capital city of Australia.";
    let mut vectors = HashMap::new();
    vectors.insert(grounded.to_string(), vec![1.0, 0.0]);
    vectors.insert(summary.to_string(), vec![1.0, 0.0]);
    vectors.insert("Sydney is the capital of Australia.".to_string(), vec![0.5, 0.5]);

    let evaluator = Evaluator::new(
        EvalConfig::default(),
        Arc::new(FakeEmbedder { vectors }),
        Arc::new(FakeEvidence { summary }),
        Arc::new(FakeSentiment),
    );
    let history = Arc::new(HistoryStore::open_in_memory().unwrap());
    let engine = Arc::new(Engine {
        providers: Arc::new(FakeProviders { answers }),
        evaluator: Arc::new(evaluator),
        history: Some(history.clone()),
        auth_token: "secret".to_string(),
    });
    (engine, history)
}

fn aggregate_request(token: Option<&str>, prompt: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/aggregate")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(
            serde_json::to_vec(&json!({ "prompt": prompt })).unwrap(),
        ))
        .unwrap()
}

#[tokio::test]
async fn aggregate_requires_a_bearer_token() {
    let (engine, _) = test_engine(vec![("Alpha", "Canberra is the capital of Australia.")]);
    let resp = router(engine)
        .oneshot(aggregate_request(None, "Capital of Australia?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn aggregate_rejects_blank_prompts() {
    let (engine, _) = test_engine(vec![("Alpha", "Canberra is the capital of Australia.")]);
    let resp = router(engine)
        .oneshot(aggregate_request(Some("secret"), "   "))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn aggregate_without_any_candidates_is_unavailable() {
    let (engine, _) = test_engine(Vec::new());
    let resp = router(engine)
        .oneshot(aggregate_request(Some("secret"), "Capital of Australia?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn aggregate_returns_a_winner_and_persists_it() {
    let (engine, history) = test_engine(vec![
        ("Grounded", "Canberra is the capital of Australia."),
        ("Shaky", "Sydney is the capital of Australia."),
    ]);
    let resp = router(engine)
        .oneshot(aggregate_request(Some("secret"), "Capital of Australia?"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let v: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(v["all_candidates"].as_array().unwrap().len(), 2);
    assert_eq!(v["prompt"], "Capital of Australia?");
    let winner = &v["winner"];
    assert_eq!(winner["response"]["provider_name"], "Grounded");
    assert!(winner["evidence_score"].as_f64().unwrap() >= 0.60);
    assert!(v["explainability"].as_str().unwrap().contains("Grounded"));

    let entries = history.list(0, 10).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].winning_provider, "Grounded");
}

#[tokio::test]
async fn history_delete_is_authenticated() {
    let (engine, history) = test_engine(Vec::new());
    let winner = quorum_rs::ScoredCandidate {
        candidate_id: 0,
        final_score: 0.7,
        evidence_score: 0.8,
        consensus_score: 0.5,
        sentiment_score: 0.5,
        response: CandidateResponse::new("Alpha", "Canberra.", "model-x"),
        evidence_snippets: Vec::new(),
    };
    let id = history.record("Q?", &winner, &[]).unwrap();

    let unauthenticated = Request::builder()
        .method("DELETE")
        .uri(format!("/api/history/{id}"))
        .body(Body::empty())
        .unwrap();
    let resp = router(engine.clone()).oneshot(unauthenticated).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let authenticated = Request::builder()
        .method("DELETE")
        .uri(format!("/api/history/{id}"))
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let resp = router(engine).oneshot(authenticated).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(history.list(0, 10).unwrap().is_empty());
}
