use async_trait::async_trait;
use thiserror::Error;

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u64 = 500;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Response contained no completion")]
    Empty,
    #[error("{0}")]
    Provider(String),
}

/// One-shot chat completion: a single user message in, trimmed text out.
///
/// Implementations make exactly one upstream call per invocation and never
/// retry or cache.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError>;
}
