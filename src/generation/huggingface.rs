//! Text2text generation through the HuggingFace inference API (e.g. Flan-T5).

use super::{ChatMessage, Generator, Role};
use crate::config::GenerationSettings;
use crate::error::{AdvisorError, Result};
use crate::huggingface::{ApiError, InferenceClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
    options: GenerationOptions,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
}

#[derive(Serialize)]
struct GenerationOptions {
    wait_for_model: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

/// Either the generated outputs or an error body sent with a success status.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextGenerationResponse {
    Outputs(Vec<GeneratedText>),
    Error(ApiError),
}

/// Flatten a conversation into a single text prompt.
///
/// A lone user message is sent verbatim. Otherwise system messages are
/// emitted as-is and turns are labelled `Student:` / `Advisor:`, ending with
/// an open `Advisor:` line for the model to complete.
pub fn render_prompt(messages: &[ChatMessage]) -> String {
    if let [only] = messages {
        if only.role == Role::User {
            return only.content.clone();
        }
    }

    let mut lines: Vec<String> = messages
        .iter()
        .map(|m| match m.role {
            Role::System => m.content.clone(),
            Role::User => format!("Student: {}", m.content),
            Role::Assistant => format!("Advisor: {}", m.content),
        })
        .collect();
    lines.push("Advisor:".to_string());
    lines.join("\n")
}

/// Generator backed by a hosted text2text model.
pub struct HuggingFaceGenerator {
    client: InferenceClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HuggingFaceGenerator {
    /// Create a generator from settings and an API token.
    pub fn new(settings: &GenerationSettings, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: InferenceClient::new(
                api_key,
                settings.api_base.as_deref(),
                settings.timeout(),
            )?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl Generator for HuggingFaceGenerator {
    #[instrument(skip(self, messages), fields(model = %self.model))]
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = render_prompt(messages);
        let url = self.client.endpoint(&self.model, None)?;

        let request = GenerationRequest {
            inputs: &prompt,
            parameters: GenerationParameters {
                max_new_tokens: self.max_tokens,
                temperature: self.temperature,
                do_sample: self.temperature > 0.0,
            },
            options: GenerationOptions {
                wait_for_model: true,
            },
        };

        let response: TextGenerationResponse = self
            .client
            .post(url, &request, AdvisorError::GenerationBackend)
            .await?;

        let outputs = match response {
            TextGenerationResponse::Outputs(outputs) => outputs,
            TextGenerationResponse::Error(error) => {
                return Err(AdvisorError::GenerationBackend(error.error));
            }
        };

        let answer = outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or_else(|| {
                AdvisorError::MalformedResponse("No generated text in response".to_string())
            })?;

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
