use crate::types::ScoredCandidate;
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS query_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at INTEGER NOT NULL,
    prompt TEXT NOT NULL,
    winning_provider TEXT NOT NULL,
    winning_text TEXT NOT NULL,
    final_score REAL NOT NULL,
    evidence_score REAL NOT NULL,
    consensus_score REAL NOT NULL,
    sentiment_score REAL NOT NULL,
    evidence_snippets_json TEXT NOT NULL,
    all_candidates_json TEXT NOT NULL
)";

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub created_at: i64,
    pub prompt: String,
    pub winning_provider: String,
    pub winning_text: String,
    pub final_score: f64,
    pub evidence_score: f64,
    pub consensus_score: f64,
    pub sentiment_score: f64,
    pub evidence_snippets: Vec<String>,
}

/// Winning answers, one row per aggregation request.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_conn(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("history store lock poisoned"))
    }

    pub fn record(
        &self,
        prompt: &str,
        winner: &ScoredCandidate,
        all_candidates: &[ScoredCandidate],
    ) -> Result<i64> {
        let created_at = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64;
        let snippets_json = serde_json::to_string(&winner.evidence_snippets)?;
        let candidates_json = serde_json::to_string(all_candidates)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO query_history (
                created_at, prompt, winning_provider, winning_text,
                final_score, evidence_score, consensus_score, sentiment_score,
                evidence_snippets_json, all_candidates_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                created_at,
                prompt,
                winner.response.provider_name,
                winner.response.text,
                winner.final_score as f64,
                winner.evidence_score as f64,
                winner.consensus_score as f64,
                winner.sentiment_score as f64,
                snippets_json,
                candidates_json,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list(&self, offset: i64, limit: i64) -> Result<Vec<HistoryEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, prompt, winning_provider, winning_text,
                    final_score, evidence_score, consensus_score, sentiment_score,
                    evidence_snippets_json
             FROM query_history
             ORDER BY created_at DESC, id DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, f64>(6)?,
                row.get::<_, f64>(7)?,
                row.get::<_, f64>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (
                id,
                created_at,
                prompt,
                winning_provider,
                winning_text,
                final_score,
                evidence_score,
                consensus_score,
                sentiment_score,
                snippets_json,
            ) = row?;
            entries.push(HistoryEntry {
                id,
                created_at,
                prompt,
                winning_provider,
                winning_text,
                final_score,
                evidence_score,
                consensus_score,
                sentiment_score,
                evidence_snippets: serde_json::from_str(&snippets_json).unwrap_or_default(),
            });
        }
        Ok(entries)
    }

    /// Returns whether a row was actually removed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM query_history WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
