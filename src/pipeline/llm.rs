//! Model interaction: build the fixed prompt, make one call, parse the reply.
//!
//! All prompt text lives in [`crate::prompts`]; reply parsing lives in
//! [`super::reply`]. This module only assembles messages and talks to the
//! provider. There are no retries: a failed call fails the request (the
//! image path's single OCR fallback is decided by the caller).

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::pipeline::reply::parse_json_reply;
use crate::prompts::{system_message, text_instruction, IMAGE_INSTRUCTION};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Parsed model output plus usage figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub json: Value,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

/// A model that turns timetable content into candidate JSON.
#[async_trait]
pub trait TimetableModel: Send + Sync {
    /// Whether credentials/provider are in place.
    fn is_configured(&self) -> bool {
        true
    }

    /// Vision path: the processed image itself.
    async fn extract_from_image(&self, image: ImageData) -> Result<ModelReply, ExtractError>;

    /// Text path: OCR output or embedded PDF text.
    async fn extract_from_text(&self, text: &str) -> Result<ModelReply, ExtractError>;
}

/// [`TimetableModel`] backed by an edgequake-llm provider.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            system_prompt: system_message(config.system_prompt.as_deref()),
            options: build_options(config),
        }
    }

    async fn call(&self, user: ChatMessage) -> Result<ModelReply, ExtractError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::system(self.system_prompt.as_str()), user];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| {
                warn!("Model call failed: {}", e);
                ExtractError::LlmApiError {
                    message: e.to_string(),
                }
            })?;

        let duration = start.elapsed();
        debug!(
            "Model reply: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens, response.completion_tokens, duration
        );

        Ok(ModelReply {
            json: parse_json_reply(&response.content)?,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
            duration_ms: duration.as_millis() as u64,
        })
    }
}

#[async_trait]
impl TimetableModel for ProviderModel {
    async fn extract_from_image(&self, image: ImageData) -> Result<ModelReply, ExtractError> {
        self.call(ChatMessage::user_with_images(IMAGE_INSTRUCTION, vec![image]))
            .await
    }

    async fn extract_from_text(&self, text: &str) -> Result<ModelReply, ExtractError> {
        self.call(ChatMessage::user(text_instruction(text))).await
    }
}

/// Stand-in used when no provider could be resolved at startup.
///
/// Keeps the service up (health reports the missing credential) while every
/// extraction fails with the resolution error.
#[derive(Debug, Clone)]
pub struct UnconfiguredModel {
    provider: String,
    hint: String,
}

impl UnconfiguredModel {
    pub fn new(provider: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            hint: hint.into(),
        }
    }

    fn error(&self) -> ExtractError {
        ExtractError::ProviderNotConfigured {
            provider: self.provider.clone(),
            hint: self.hint.clone(),
        }
    }
}

#[async_trait]
impl TimetableModel for UnconfiguredModel {
    fn is_configured(&self) -> bool {
        false
    }

    async fn extract_from_image(&self, _image: ImageData) -> Result<ModelReply, ExtractError> {
        Err(self.error())
    }

    async fn extract_from_text(&self, _text: &str) -> Result<ModelReply, ExtractError> {
        Err(self.error())
    }
}

/// Build `CompletionOptions` from the extraction config.
///
/// JSON mode is requested on every call. Providers without it ignore the
/// flag, and the prompt plus [`parse_json_reply`] cover them.
fn build_options(config: &ExtractionConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        response_format: Some("json_object".to_string()),
        ..Default::default()
    }
}
