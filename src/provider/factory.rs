// PromptShelf — Provider factory

use super::{http::HTTPProvider, LLMProvider};
use crate::config::{Config, ConfigError};
use std::time::Duration;

/// Create the evaluator's LLM provider from the loaded config.
pub fn create_provider(cfg: &Config) -> anyhow::Result<Box<dyn LLMProvider>> {
    let ev = &cfg.evaluator;
    if ev.api_key.is_empty() {
        return Err(ConfigError::MissingApiKey.into());
    }

    tracing::info!(
        model = %ev.model,
        api_base = %if ev.api_base.is_empty() { "(default)" } else { &ev.api_base },
        "Creating LLM provider"
    );

    let provider = HTTPProvider::new(
        ev.api_key.clone(),
        ev.api_base.clone(),
        Some(ev.proxy.as_str()),
        ev.model.clone(),
        Duration::from_secs(ev.timeout_secs.max(1)),
    )?
    .with_retries(ev.max_retries, Duration::from_millis(ev.retry_delay_ms));

    Ok(Box::new(provider))
}
