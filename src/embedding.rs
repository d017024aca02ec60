use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::CreateEmbeddingRequestArgs,
    Client,
};
use once_cell::sync::OnceCell;

/// Text-to-vector collaborator. `embed_many` keeps positional alignment with
/// its input; a failed item comes back as an empty vector.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Cosine similarity in [-1,1]. Zero for mismatched lengths or
/// zero-magnitude input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0) as f32
    }
}

#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl EmbedderConfig {
    pub fn from_env(model: &str) -> Self {
        Self {
            model: model.to_string(),
            base_url: std::env::var("EMBEDDINGS_BASE_URL").ok(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        }
    }
}

/// OpenAI-compatible embeddings endpoint.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(cfg: &EmbedderConfig) -> Self {
        let mut oa = OpenAIConfig::default();
        if let Some(url) = &cfg.base_url {
            oa = oa.with_api_base(url);
        }
        if let Some(key) = &cfg.api_key {
            oa = oa.with_api_key(key);
        }
        Self { client: Client::with_config(oa), model: cfg.model.clone() }
    }
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let req = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(text)
            .build()?;
        let resp = self.client.embeddings().create(req).await?;
        Ok(resp.data.into_iter().next().map(|d| d.embedding).unwrap_or_default())
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()?;
        let resp = self.client.embeddings().create(req).await?;
        // The endpoint tags each vector with its input index; keep alignment
        // and leave holes empty.
        let mut out = vec![Vec::new(); texts.len()];
        for item in resp.data {
            let idx = item.index as usize;
            if idx < out.len() {
                out[idx] = item.embedding;
            }
        }
        Ok(out)
    }
}

/// Shared handle with race-free one-time construction of the underlying
/// client. The cell guards first use; after that the inner embedder is
/// read-only and shared.
pub struct LazyEmbedder {
    cfg: EmbedderConfig,
    cell: OnceCell<OpenAiEmbedder>,
}

impl LazyEmbedder {
    pub fn new(cfg: EmbedderConfig) -> Self {
        Self { cfg, cell: OnceCell::new() }
    }

    fn inner(&self) -> &OpenAiEmbedder {
        self.cell.get_or_init(|| {
            tracing::info!(model = %self.cfg.model, "initializing embedding client");
            OpenAiEmbedder::new(&self.cfg)
        })
    }
}

#[async_trait::async_trait]
impl Embedder for LazyEmbedder {
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.inner().embed_one(text).await
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.inner().embed_many(texts).await
    }
}
