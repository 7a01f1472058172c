//! services/api/src/adapters/wish_llm.rs
//!
//! This module contains the adapter for the wish-suggestion LLM.
//! It implements the `WishGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use countdown_core::ports::{PortError, PortResult, WishGenerationService};

const SYSTEM_INSTRUCTIONS: &str = "You write short, warm messages of encouragement for \
high-school students preparing for their national graduation exam. Reply with the message \
only, no quotes and no explanation.";

const USER_PROMPT: &str = "Write one short, cute wish (under 30 words) cheering on the \
students born in 2008 who are studying for the 2026 national exam. Include an emoji.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `WishGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiWishAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiWishAdapter {
    /// Creates a new `OpenAiWishAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `WishGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl WishGenerationService for OpenAiWishAdapter {
    async fn generate_wish(&self) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(USER_PROMPT)
                .build()
                .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(messages)
            .max_tokens(80u32)
            .temperature(0.9)
            .build()
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let wish = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No wish generated".to_string()))?;

        Ok(wish.trim().to_string())
    }
}
