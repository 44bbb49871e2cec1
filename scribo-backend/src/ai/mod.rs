//! AI text actions proxied to an OpenAI-compatible chat completions API

pub mod actions;
pub mod client;
pub mod rate_limit;

pub use actions::{AiAction, SummaryLength, Tone};
pub use client::{AiError, ChatCompletionsClient, CompletionBackend};
pub use rate_limit::RateLimiter;

use std::sync::Arc;

use crate::config::AiConfig;

/// Build the configured backend. Returns `Ok(None)` when no API key is set.
pub fn backend_from_config(config: &AiConfig) -> Result<Option<Arc<dyn CompletionBackend>>, AiError> {
    let Some(api_key) = config.api_key.clone() else {
        log::warn!("[AI] AI_API_KEY not set, AI actions are disabled");
        return Ok(None);
    };

    let client = ChatCompletionsClient::new(
        config.api_url.clone(),
        api_key,
        config.model.clone(),
        config.timeout_secs,
    )?;
    log::info!("[AI] Using model {} at {}", config.model, config.api_url);
    Ok(Some(Arc::new(client)))
}
