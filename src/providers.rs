use crate::llm::{Llm, LlmClient};
use crate::types::CandidateResponse;
use anyhow::Result;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Supplies candidate answers for a prompt. May legitimately return an empty
/// list when every provider fails; that is a defined outcome, not an error.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn get_candidates(&self, prompt: &str) -> Result<Vec<CandidateResponse>>;
}

struct Provider {
    label: String,
    model: String,
    client: Arc<dyn Llm>,
}

/// Fans one prompt out to every configured provider concurrently and keeps
/// whatever came back. Failures are logged and dropped.
#[derive(Default)]
pub struct ProviderPool {
    providers: Vec<Provider>,
}

impl ProviderPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, model: impl Into<String>, client: Arc<dyn Llm>) {
        self.providers.push(Provider {
            label: label.into(),
            model: model.into(),
            client,
        });
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Build the pool from provider API keys in the environment. Providers
    /// without a key are skipped.
    pub fn from_env() -> Self {
        let mut pool = Self::new();
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let model =
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4-turbo".to_string());
            let client = LlmClient::new(model.clone(), None, Some(key), 0.3);
            pool.push("OpenAI", model, Arc::new(client));
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            let model = std::env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string());
            let client = LlmClient::new(
                model.clone(),
                Some("https://api.groq.com/openai/v1".to_string()),
                Some(key),
                0.3,
            );
            pool.push("Groq (Llama 3)", model, Arc::new(client));
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            let model = std::env::var("OPENROUTER_MODEL")
                .unwrap_or_else(|_| "anthropic/claude-3.5-sonnet".to_string());
            let client = LlmClient::new(
                model.clone(),
                Some("https://openrouter.ai/api/v1".to_string()),
                Some(key),
                0.3,
            );
            pool.push("OpenRouter", model, Arc::new(client));
        }
        pool
    }
}

fn build_prompt(user_prompt: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
    let system = ChatCompletionRequestSystemMessageArgs::default()
        .content("Answer concisely in plain text without markdown.")
        .build()?
        .into();
    let user = ChatCompletionRequestUserMessageArgs::default()
        .content(format!(
            "Provide a direct, concise answer to the following question. \
             Use plain text only, no markdown formatting.\n\nQuestion: {user_prompt}"
        ))
        .build()?
        .into();
    Ok(vec![system, user])
}

#[async_trait::async_trait]
impl CandidateSource for ProviderPool {
    async fn get_candidates(&self, prompt: &str) -> Result<Vec<CandidateResponse>> {
        let messages = build_prompt(prompt)?;
        info!(providers = self.providers.len(), "dispatching provider queries");

        let tasks = self.providers.iter().map(|provider| {
            let messages = messages.clone();
            async move {
                match provider.client.chat(messages).await {
                    Ok(text) if !text.trim().is_empty() => Some(CandidateResponse::new(
                        provider.label.clone(),
                        &text,
                        provider.model.clone(),
                    )),
                    Ok(_) => {
                        warn!(provider = %provider.label, "provider returned an empty answer");
                        None
                    }
                    Err(err) => {
                        warn!(provider = %provider.label, error = %err, "provider query failed");
                        None
                    }
                }
            }
        });

        let candidates: Vec<CandidateResponse> =
            join_all(tasks).await.into_iter().flatten().collect();
        info!(received = candidates.len(), "provider fan-out complete");
        Ok(candidates)
    }
}
