// PromptShelf — Chat-completions client used by the prompt evaluator

pub mod factory;
pub mod http;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// One completion: the conversation plus how the reply should look.
#[derive(Debug, Clone)]
pub struct Completion {
    pub messages: Vec<Message>,
    pub temperature: f32,
    /// Ask the model for a bare JSON object.
    pub json_reply: bool,
}

/// Something that turns a conversation into the assistant's reply text.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: &Completion) -> anyhow::Result<String>;

    fn model(&self) -> &str;
}
