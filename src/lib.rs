//! Evidence-grounded aggregation of multi-LLM answers: fan a prompt out to
//! several providers, score each answer on external evidence support, pool
//! consensus, and clarity, and pick a winner with an explanation.

pub mod claims;
pub mod config;
pub mod consensus;
pub mod embedding;
pub mod evaluator;
pub mod evidence;
pub mod history;
pub mod llm;
pub mod providers;
pub mod sentiment;
pub mod server;
pub mod types;
pub mod wiki;

pub use config::{EvalConfig, ScoringWeights};
pub use evaluator::Evaluator;
pub use types::{CandidateResponse, EvaluationResult, ScoredCandidate};
