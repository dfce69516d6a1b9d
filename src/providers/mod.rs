use crate::core::error::EloyError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub mod base_client;
pub mod factory;
pub mod offline;
pub mod openai_compatible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
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
}

/// A chat-completion backend.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    fn model(&self) -> &str;

    async fn get_response(&self, messages: &[Message]) -> Result<String, EloyError>;

    async fn get_response_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String, EloyError>>, EloyError>;
}
