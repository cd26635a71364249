//! LLM provider implementations

pub mod chat;
pub mod traits;

pub use chat::ChatClient;
pub use traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ProviderError, ProviderResult,
};

use std::sync::Arc;

use crate::config::Config;

/// Create the chat provider described by `config`.
///
/// Missing credentials are reported here, before any row is processed.
pub fn create_provider_with_config(config: &Config) -> ProviderResult<Arc<dyn LLMProvider + Send + Sync>> {
    let mut client = ChatClient::from_config(&config.service)?;
    if let Some(first) = config.generation.models.first() {
        client = client.with_model(first);
    }
    Ok(Arc::new(client))
}
