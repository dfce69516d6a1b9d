use crate::core::error::EloyError;
use crate::providers::base_client::HttpClient;
use crate::providers::{LLMProvider, Message};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Collects the `delta.content` text of OpenAI-style SSE lines.
/// Returns `None` for keep-alives, `[DONE]` and lines without text.
pub fn openai_stream_parser(data: String) -> Result<Option<String>, EloyError> {
    let mut content = String::new();

    for line in data.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload == "[DONE]" {
            break;
        }

        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(payload) else {
            tracing::debug!(line = payload, "skipping non-JSON stream line");
            continue;
        };

        if let Some(message) = parsed.pointer("/error/message").and_then(|m| m.as_str()) {
            return Err(EloyError::Api(format!("Stream error: {}", message)));
        }
        if let Some(text) = parsed
            .pointer("/choices/0/delta/content")
            .and_then(|c| c.as_str())
        {
            content.push_str(text);
        }
    }

    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(content))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: Option<String>,
}

/// Any endpoint speaking the `chat/completions` dialect (Groq, OpenAI, OpenRouter).
#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    client: HttpClient,
    model: String,
    temperature: f32,
}

impl OpenAICompatibleProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, EloyError> {
        let auth_header = Some(("Authorization".to_string(), format!("Bearer {}", api_key)));

        Ok(Self {
            client: HttpClient::new(base_url, auth_header, None, timeout)?,
            model,
            temperature,
        })
    }

    fn request<'a>(&'a self, messages: &'a [Message], stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            stream: stream.then_some(true),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn get_response(&self, messages: &[Message]) -> Result<String, EloyError> {
        let payload = self.request(messages, false);
        let response = self.client.post("chat/completions", &payload).await?;

        let response_body: String = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_body)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EloyError::Api("No choices in API response".to_string()))?
            .message
            .content
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }

    async fn get_response_stream(
        &self,
        messages: &[Message],
    ) -> Result<BoxStream<'static, Result<String, EloyError>>, EloyError> {
        let payload = self.request(messages, true);
        self.client
            .post_stream("chat/completions", &payload, openai_stream_parser)
            .await
    }
}
