use crate::core::error::EloyError;
use crate::providers::{LLMProvider, Message, Role};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// Stand-in used when no API key is configured: echoes the last user
/// message so the rest of the assistant can be exercised offline.
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    assistant_name: String,
}

impl OfflineProvider {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        Self {
            assistant_name: assistant_name.into(),
        }
    }

    fn answer(&self, messages: &[Message]) -> String {
        let text = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("{} (modo teste): {}", self.assistant_name, text)
    }
}

#[async_trait]
impl LLMProvider for OfflineProvider {
    fn model(&self) -> &str {
        "offline"
    }

    async fn get_response(&self, messages: &[Message]) -> Result<String, EloyError> {
        Ok(self.answer(messages))
    }

    async fn get_response_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String, EloyError>>, EloyError> {
        Ok(stream::once(futures::future::ready(Ok(self.answer(messages)))).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_the_last_user_message() {
        let provider = OfflineProvider::new("Eloy");
        let answer = provider
            .get_response(&[Message::system("persona"), Message::user("Qual o CNPJ?")])
            .await
            .unwrap();
        assert_eq!(answer, "Eloy (modo teste): Qual o CNPJ?");
    }
}
