//! HTTP client for an OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GenerationConfig;

use super::{Directive, GenerationError, GenerationResult, GenerationService, prompt};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Generation service talking to `POST {api_url}/chat/completions`.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl ChatCompletionsClient {
    pub fn new(config: &GenerationConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &GenerationConfig) -> Self {
        Self {
            client,
            endpoint: chat_endpoint(&config.api_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, prompt: &str) -> GenerationResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::EmptyResponse)
    }
}

/// `https://host/openai/v1` -> `https://host/openai/v1/chat/completions`
fn chat_endpoint(base: &Url) -> Url {
    let mut endpoint = base.clone();
    let path = format!("{}/chat/completions", base.path().trim_end_matches('/'));
    endpoint.set_path(&path);
    endpoint
}

#[async_trait]
impl GenerationService for ChatCompletionsClient {
    async fn generate(&self, text: &str, directive: Directive<'_>) -> GenerationResult<String> {
        self.complete(&prompt::render(text, directive)).await
    }

    async fn generate_test_set(&self, text: &str) -> GenerationResult<String> {
        let raw = self.complete(&prompt::render_test_set(text)).await?;
        tracing::debug!(len = raw.len(), "Received raw test payload");
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_appended_to_base_path() {
        let base = Url::parse("https://api.groq.com/openai/v1/").unwrap();
        assert_eq!(
            chat_endpoint(&base).as_str(),
            "https://api.groq.com/openai/v1/chat/completions"
        );

        let bare = Url::parse("http://localhost:8080").unwrap();
        assert_eq!(
            chat_endpoint(&bare).as_str(),
            "http://localhost:8080/chat/completions"
        );
    }
}
