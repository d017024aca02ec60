use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use quorum_rs::providers::CandidateSource;
use quorum_rs::*;

#[derive(Parser)]
#[command(name = "quorum", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
    /// Similarity a snippet needs to count as supporting evidence
    #[arg(long, default_value_t = 0.60)]
    similarity_threshold: f32,
    #[arg(long, default_value_t = 3)]
    search_results: usize,
    #[arg(long, default_value_t = 5)]
    summary_sentences: usize,
    #[arg(long, default_value_t = 0.5)]
    weight_evidence: f32,
    #[arg(long, default_value_t = 0.3)]
    weight_consensus: f32,
    #[arg(long, default_value_t = 0.2)]
    weight_clarity: f32,
    /// Evidence-score each extracted claim instead of the whole answer
    #[arg(long)]
    per_claim: bool,
    #[arg(long, default_value = "text-embedding-3-small")]
    embed_model: String,
    #[arg(long, default_value = "https://en.wikipedia.org/w/api.php")]
    wiki_api: String,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the aggregation API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: String,
        #[arg(long, default_value = "./data/history.sqlite")]
        history_db: String,
    },
    /// Fan a prompt out to all configured providers and print the evaluation
    Evaluate {
        #[arg(long)]
        prompt: String,
    },
    /// Print the claims extracted from a piece of text
    Claims {
        #[arg(long)]
        text: String,
    },
}

fn eval_config(cli: &Cli) -> EvalConfig {
    EvalConfig {
        weights: ScoringWeights {
            evidence: cli.weight_evidence,
            consensus: cli.weight_consensus,
            clarity: cli.weight_clarity,
        },
        similarity_threshold: cli.similarity_threshold,
        search_results: cli.search_results,
        summary_sentences: cli.summary_sentences,
        per_claim_evidence: cli.per_claim,
        ..EvalConfig::default()
    }
}

fn build_evaluator(cli: &Cli) -> Result<Evaluator> {
    let embedder = Arc::new(embedding::LazyEmbedder::new(
        embedding::EmbedderConfig::from_env(&cli.embed_model),
    ));
    let source = Arc::new(wiki::WikiClient::new(&cli.wiki_api, 5, 10_000)?);
    let classifier = Arc::new(sentiment::HttpSentimentClassifier::from_env()?);
    Ok(Evaluator::new(eval_config(cli), embedder, source, classifier))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.cmd {
        Cmd::Serve { addr, history_db } => {
            let token = std::env::var("AGGREGATOR_TOKEN")
                .map_err(|_| anyhow::anyhow!("AGGREGATOR_TOKEN is not set"))?;
            let engine = server::Engine {
                providers: Arc::new(providers::ProviderPool::from_env()),
                evaluator: Arc::new(build_evaluator(&cli)?),
                history: Some(Arc::new(history::HistoryStore::open(history_db.as_ref())?)),
                auth_token: token,
            };
            server::run_server(engine, addr).await
        }
        Cmd::Evaluate { prompt } => {
            let pool = providers::ProviderPool::from_env();
            anyhow::ensure!(!pool.is_empty(), "no provider API keys configured");
            let evaluator = build_evaluator(&cli)?;
            let candidates = pool.get_candidates(prompt).await?;
            let result = evaluator.evaluate(prompt, &candidates).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Cmd::Claims { text } => {
            for claim in claims::extract_claims(text) {
                println!("{claim}");
            }
            Ok(())
        }
    }
}
