use crate::llm::types::{self, CompletionError, MAX_TOKENS, TEMPERATURE};
use async_trait::async_trait;
use rig::{
    client::CompletionClient,
    completion::Prompt,
    providers::{anthropic, openai},
};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAi,
    Anthropic,
}

/// Completions through rig provider clients. A client is built per call
/// because the API key lives in storage and may change at runtime.
pub struct RigCompletion {
    provider: RigProvider,
    base_url: String,
    model: String,
}

impl RigCompletion {
    pub fn new(provider: RigProvider, base_url: &str, model: &str) -> Self {
        info!(
            "Completion service initialized (provider: {:?}, model: {})",
            provider, model
        );
        Self {
            provider,
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }

    async fn run<C>(client: &C, model: &str, prompt: &str) -> Result<String, CompletionError>
    where
        C: CompletionClient,
        C::CompletionModel: 'static,
    {
        let agent = client
            .agent(model)
            .temperature(TEMPERATURE)
            .max_tokens(MAX_TOKENS)
            .build();

        let response = agent
            .prompt(prompt)
            .await
            .map_err(|e| CompletionError::Provider(e.to_string()))?;

        let text = response.to_string();
        if text.trim().is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl types::CompletionService for RigCompletion {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError> {
        match self.provider {
            RigProvider::OpenAi => {
                let client: openai::CompletionsClient = openai::CompletionsClient::builder()
                    .api_key(api_key)
                    .base_url(&self.base_url)
                    .build()
                    .map_err(|e| CompletionError::Provider(e.to_string()))?;
                Self::run(&client, &self.model, prompt).await
            }
            RigProvider::Anthropic => {
                let client: anthropic::Client = anthropic::Client::builder()
                    .api_key(api_key)
                    .base_url(&self.base_url)
                    .build()
                    .map_err(|e| CompletionError::Provider(e.to_string()))?;
                Self::run(&client, &self.model, prompt).await
            }
        }
    }
}
