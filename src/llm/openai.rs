use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs},
    Client,
};

use super::Llm;

/// OpenAI-compatible chat client. The base URL override covers
/// Groq/OpenRouter-style endpoints that speak the same protocol.
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl LlmClient {
    pub fn new(
        model: String,
        base_url: Option<String>,
        api_key: Option<String>,
        temperature: f32,
    ) -> Self {
        let mut cfg = OpenAIConfig::default();
        if let Some(url) = base_url {
            cfg = cfg.with_api_base(url);
        }
        if let Some(key) = api_key {
            cfg = cfg.with_api_key(key);
        }
        Self {
            client: Client::with_config(cfg),
            model,
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl Llm for LlmClient {
    async fn chat(&self, messages: Vec<ChatCompletionRequestMessage>) -> Result<String> {
        let req = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()?;
        let resp = self.client.chat().create(req).await?;
        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(text)
    }
}
