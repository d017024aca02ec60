// src/server.rs
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::evaluator::Evaluator;
use crate::history::{HistoryEntry, HistoryStore};
use crate::providers::CandidateSource;
use crate::types::{EvaluationResult, ScoredCandidate};

pub struct Engine {
    pub providers: Arc<dyn CandidateSource>,
    pub evaluator: Arc<Evaluator>,
    pub history: Option<Arc<HistoryStore>>,
    pub auth_token: String,
}

#[derive(Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct AggregateResponse {
    pub winner: Option<ScoredCandidate>,
    pub explainability: String,
    pub all_candidates: Vec<ScoredCandidate>,
    pub prompt: String,
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t == token)
        .unwrap_or(false)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "quorum API is running" }))
}

async fn aggregate(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
    Json(req): Json<AskRequest>,
) -> Result<Json<AggregateResponse>, StatusCode> {
    if !authorized(&headers, &engine.auth_token) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if req.prompt.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    info!(
        prompt = %req.prompt.chars().take(50).collect::<String>(),
        "new aggregation request"
    );

    let candidates = match engine.providers.get_candidates(&req.prompt).await {
        Ok(candidates) => candidates,
        Err(err) => {
            error!(error = %err, "provider fan-out failed");
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    };
    if candidates.is_empty() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let result = engine.evaluator.evaluate(&req.prompt, &candidates).await;
    persist(&engine, &req.prompt, &result);

    Ok(Json(AggregateResponse {
        winner: result.winner,
        explainability: result.explainability,
        all_candidates: result.all_candidates,
        prompt: req.prompt,
    }))
}

fn persist(engine: &Engine, prompt: &str, result: &EvaluationResult) {
    let (Some(history), Some(winner)) = (engine.history.as_deref(), result.winner.as_ref()) else {
        return;
    };
    match history.record(prompt, winner, &result.all_candidates) {
        Ok(id) => info!(id, "saved query to history"),
        Err(err) => error!(error = %err, "failed to save query history"),
    }
}

#[derive(Deserialize)]
pub struct Paging {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    10
}

async fn history_list(
    State(engine): State<Arc<Engine>>,
    Query(page): Query<Paging>,
) -> Result<Json<Vec<HistoryEntry>>, StatusCode> {
    let Some(history) = engine.history.as_deref() else {
        return Ok(Json(Vec::new()));
    };
    history.list(page.offset, page.limit).map(Json).map_err(|err| {
        error!(error = %err, "history query failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

async fn history_delete(
    State(engine): State<Arc<Engine>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !authorized(&headers, &engine.auth_token) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let Some(history) = engine.history.as_deref() else {
        return Err(StatusCode::NOT_FOUND);
    };
    match history.delete(id) {
        Ok(true) => Ok(Json(serde_json::json!({ "ok": true }))),
        Ok(false) => Err(StatusCode::NOT_FOUND),
        Err(err) => {
            error!(error = %err, "history delete failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/aggregate", post(aggregate))
        .route("/api/history", get(history_list))
        .route("/api/history/:id", delete(history_delete))
        .with_state(engine)
}

pub async fn run_server(engine: Engine, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "listening");
    axum::serve(listener, router(Arc::new(engine))).await?;
    Ok(())
}
