//! Text generation backends.
//!
//! A backend is an opaque `messages -> text` function. Chat-completion
//! services receive the messages as-is; text-only models get them flattened
//! into a single prompt.

mod huggingface;
mod openai;

pub use huggingface::{render_prompt, HuggingFaceGenerator};
pub use openai::OpenAIGenerator;

use crate::config::{api_key_from_env, GenerationProvider, GenerationSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Trait for text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to the conversation.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}

/// Create the configured generator.
///
/// Fails with an authentication error when the provider's token is missing.
pub fn create_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    let api_key = api_key_from_env(settings.api_key_env())?;

    let generator: Arc<dyn Generator> = match settings.provider {
        GenerationProvider::Groq | GenerationProvider::OpenAI => {
            Arc::new(OpenAIGenerator::new(settings, &api_key)?)
        }
        GenerationProvider::HuggingFace => Arc::new(HuggingFaceGenerator::new(settings, &api_key)?),
    };

    Ok(generator)
}
