mod groq;
pub mod prompts;
mod rig_completion;
mod types;

use crate::config::Config;
use groq::GroqCompletion;
use rig_completion::{RigCompletion, RigProvider};
use std::sync::Arc;
pub use types::{CompletionError, CompletionService};

pub fn create_completion_service(config: &Config) -> Arc<dyn CompletionService> {
    match config.api_provider.as_str() {
        "openai" => Arc::new(RigCompletion::new(
            RigProvider::OpenAi,
            &config.api_url,
            &config.model,
        )),
        "anthropic" => Arc::new(RigCompletion::new(
            RigProvider::Anthropic,
            &config.api_url,
            &config.model,
        )),
        _ => Arc::new(GroqCompletion::new(&config.api_url, &config.model)),
    }
}
