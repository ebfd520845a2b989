//! Text generation seam and its OpenAI-compatible implementation

use crate::error::ServiceError;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, info};

/// A single system + user exchange
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// Overrides the generator's default temperature
    pub temperature: Option<f32>,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Anything that can turn a prompt into text within a token budget
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, ServiceError>;
}

/// Chat completions against OpenAI or any compatible endpoint
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiGenerator {
    pub fn new(api_key: &str, base_url: Option<&str>, model: &str, temperature: f32) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }

        info!(
            "OpenAI generator initialized: model={}, base_url={}",
            model,
            base_url.unwrap_or("default")
        );

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, ServiceError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(prompt.system.clone())
                .build()
                .map_err(|e| ServiceError::Request(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.user.clone())
                .build()
                .map_err(|e| ServiceError::Request(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(max_tokens)
            .temperature(prompt.temperature.unwrap_or(self.temperature))
            .build()
            .map_err(|e| ServiceError::Request(e.to_string()))?;

        debug!("Sending chat completion request to model {}", self.model);
        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ServiceError::EmptyResponse)
    }
}
