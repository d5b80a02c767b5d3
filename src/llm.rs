use async_trait::async_trait;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs,
    },
    Client,
};

use crate::error::{LivroError, Result};

/// Text-completion seam. The assistant talks to the provider through this
/// trait so tests can substitute a scripted implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate_text(&self, prompt: &str, system_prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct OpenAiProvider {
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| "gpt-4o-mini".to_string());
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            model,
            client: Client::with_config(config),
        }
    }

    fn build_system_message(system_prompt: &str) -> Result<Option<ChatCompletionRequestMessage>> {
        if system_prompt.is_empty() {
            return Ok(None);
        }
        let message = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| LivroError::Runtime(e.to_string()))?;
        Ok(Some(ChatCompletionRequestMessage::System(message)))
    }

    fn build_user_message(prompt: &str) -> Result<ChatCompletionRequestMessage> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                prompt.to_string(),
            ))
            .build()
            .map_err(|e| LivroError::Runtime(e.to_string()))?;
        Ok(ChatCompletionRequestMessage::User(message))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_text(&self, prompt: &str, system_prompt: &str) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = Self::build_system_message(system_prompt)? {
            messages.push(system);
        }
        messages.push(Self::build_user_message(prompt)?);

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .build()
            .map_err(|e| LivroError::Runtime(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| LivroError::Http(e.to_string()))?;

        let message = response
            .choices
            .first()
            .ok_or_else(|| LivroError::Runtime("no choices returned".to_string()))?
            .message
            .content
            .clone()
            .unwrap_or_default();
        Ok(message)
    }
}
