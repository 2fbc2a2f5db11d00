//! OpenAI-compatible chat client.
//!
//! Talks to api.openai.com by default, or to any server that speaks the same
//! `/v1/chat/completions` protocol when an API base is given.

use std::time::{Duration, Instant};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use loom_core::{AgentError, Message, MessageRole, ModelConfig};
use tracing::{debug, info};

use crate::ChatModel;

/// Token usage and timing metrics from an LLM call.
#[derive(Debug, Clone, Default)]
pub struct LlmMetrics {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub elapsed_ms: u64,
}

/// Complete response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub id: String,
    pub content: String,
    pub metrics: LlmMetrics,
}

/// Converts any error into an AgentError::LlmError.
fn llm_err(e: impl ToString) -> AgentError {
    AgentError::LlmError(e.to_string())
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Converts conversation messages into chat-completion request messages.
fn build_messages(history: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
    history
        .iter()
        .map(|msg| -> Result<ChatCompletionRequestMessage, AgentError> {
            let role_msg = match msg.role {
                MessageRole::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(&*msg.content)
                        .build()
                        .map_err(llm_err)?,
                ),
                MessageRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(&*msg.content)
                        .build()
                        .map_err(llm_err)?,
                ),
                MessageRole::Assistant => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(&*msg.content)
                        .build()
                        .map_err(llm_err)?,
                ),
            };
            Ok(role_msg)
        })
        .collect()
}

/// Extracts content and metrics from a completion response.
fn extract_response(response: CreateChatCompletionResponse, elapsed_ms: u64) -> Result<LlmResponse, AgentError> {
    let id = response.id;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AgentError::LlmError("No response content".into()))?;

    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));

    info!(
        "LLM: {}ms, tokens: {}/{} (in/out)",
        elapsed_ms, input_tokens, output_tokens
    );

    Ok(LlmResponse {
        id,
        content,
        metrics: LlmMetrics { input_tokens, output_tokens, elapsed_ms },
    })
}

/// Client for OpenAI-compatible chat completion APIs.
///
/// The API key always comes from `OPENAI_API_KEY`; it may be empty for
/// self-hosted endpoints that do not check it.
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
}

impl LlmClient {
    /// Creates a new client for the given model and optional API base URL.
    pub fn new(model: &str, api_base: Option<&str>) -> Self {
        let config = match api_base {
            Some(base) => OpenAIConfig::new()
                .with_api_base(base)
                .with_api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default()),
            None => OpenAIConfig::default(),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: None,
        }
    }

    /// Creates a client from a model configuration.
    pub fn from_config(config: &ModelConfig) -> Self {
        let client = Self::new(&config.model, config.api_base.as_deref());
        match config.temperature {
            Some(t) => client.with_temperature(t),
            None => client,
        }
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sends the conversation and returns the complete response.
    pub async fn chat(&self, history: &[Message]) -> Result<LlmResponse, AgentError> {
        let start = Instant::now();
        let messages = build_messages(history)?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(&self.model).messages(messages);
        if let Some(temperature) = self.temperature {
            request_builder.temperature(temperature);
        }

        let request = request_builder.build().map_err(llm_err)?;
        debug!("Sending {} messages to {}", history.len(), self.model);

        let response = self.client.chat().create(request).await.map_err(llm_err)?;
        extract_response(response, millis(start.elapsed()))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn invoke(&self, messages: &[Message]) -> Result<Message, AgentError> {
        let response = self.chat(messages).await?;
        Ok(Message::assistant(response.content).with_id(response.id))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
