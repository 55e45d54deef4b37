// PromptShelf — OpenAI-compatible chat-completions client

use super::{Completion, LLMProvider, Message};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";
const GROQ_BASE: &str = "https://api.groq.com/openai/v1";

/// Pick an API base from the key prefix when none is configured.
fn base_for_key(api_key: &str) -> &'static str {
    if api_key.starts_with("sk-or-") {
        OPENROUTER_BASE
    } else if api_key.starts_with("gsk_") {
        GROQ_BASE
    } else {
        OPENAI_BASE
    }
}

pub struct HTTPProvider {
    api_key: String,
    endpoint: String,
    client: Client,
    model: String,
    max_retries: usize,
    retry_delay: Duration,
}

impl HTTPProvider {
    pub fn new(
        api_key: String,
        api_base: String,
        proxy: Option<&str>,
        model: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)));
        if let Some(proxy_url) = proxy.filter(|p| !p.is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        let base = if api_base.is_empty() {
            base_for_key(&api_key).to_string()
        } else {
            api_base
        };

        Ok(Self {
            api_key,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            client: builder.build()?,
            model,
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Retry 5xx and 429 responses and network errors up to `max_retries` times.
    pub fn with_retries(mut self, max_retries: usize, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, request: &'a Completion) -> Self {
        Self {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request.json_reply.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Extract the assistant text from a chat-completions response body.
fn reply_text(body: &str) -> anyhow::Result<String> {
    let reply: ChatReply = serde_json::from_str(body)?;
    if let Some(err) = reply.error {
        anyhow::bail!("LLM API error: {}", err.message);
    }
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No choices in LLM response"))?;
    Ok(choice.message.content.unwrap_or_default())
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl LLMProvider for HTTPProvider {
    async fn complete(&self, request: &Completion) -> anyhow::Result<String> {
        let body = ChatRequest::new(&self.model, request);

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tracing::info!(attempt, delay_ms = self.retry_delay.as_millis() as u64, "Retrying LLM request");
                tokio::time::sleep(self.retry_delay).await;
            }
            tracing::debug!(url = %self.endpoint, model = %self.model, attempt, "Sending LLM request");

            let sent = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;
            let can_retry = attempt < self.max_retries;
            attempt += 1;

            let response = match sent {
                Ok(r) => r,
                Err(e) if can_retry => {
                    tracing::warn!(error = %e, "Network error during LLM request");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            let text = response.text().await?;
            if status.is_success() {
                tracing::debug!(status = %status, body_len = text.len(), "LLM response received");
                return reply_text(&text);
            }
            if is_transient(status) && can_retry {
                tracing::warn!(status = %status, "Transient LLM API error: {}", text);
                continue;
            }
            anyhow::bail!("LLM API error ({}): {}", status, text);
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
