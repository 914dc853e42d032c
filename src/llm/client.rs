//! OpenAI-compatible LLM client.
//!
//! This client works with any OpenAI-compatible API endpoint
//! (OpenAI, vLLM, Ollama, LiteLLM proxies).

use super::generation::{Candidate, FinishReason, Generation, GenerativeProvider};
use crate::config::LlmConfig;
use crate::error::{RagError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message role in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Get the API endpoint URL.
    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.resolved_api_base())
    }

    /// Send a chat completion request.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<Generation> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Try to parse as API error
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                return Err(RagError::LlmApi(format!(
                    "API error ({}): {}",
                    status, api_error.error.message
                )));
            }
            return Err(RagError::LlmApi(format!(
                "Request failed ({}): {}",
                status, body
            )));
        }

        parse_completion(&body)
    }
}

/// Normalise a chat completion body.
fn parse_completion(body: &str) -> Result<Generation> {
    let completion: ChatCompletionResponse = serde_json::from_str(body)?;

    let candidate = completion.choices.into_iter().next().map(|choice| {
        match choice.message.refusal.filter(|r| !r.is_empty()) {
            Some(refusal) => Candidate {
                text: refusal,
                finish_reason: Some(FinishReason::Refusal),
                safety_ratings: Vec::new(),
            },
            None => Candidate {
                text: choice.message.content.unwrap_or_default(),
                finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_code),
                safety_ratings: Vec::new(),
            },
        }
    });

    Ok(Generation {
        candidate,
        prompt_feedback: None,
    })
}

#[async_trait]
impl GenerativeProvider for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<Generation> {
        self.chat(vec![Message::user(prompt)]).await
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;

    fn config(api_base: &str) -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::OpenAi,
            api_base: api_base.to_string(),
            api_key: "test".to_string(),
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_message_creation() {
        let sys = Message::system("You are helpful.");
        let user = Message::user("Hello!");

        assert!(matches!(sys.role, Role::System));
        assert!(matches!(user.role, Role::User));
    }

    #[test]
    fn test_endpoint_construction() {
        let client = LlmClient::new(config("https://api.example.com/")).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");

        // Without trailing slash
        let client2 = LlmClient::new(config("https://api.example.com")).unwrap();
        assert_eq!(client2.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_parse_normal_completion() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "Madrid."}, "finish_reason": "stop"}]}"#;
        let generation = parse_completion(body).unwrap();
        let candidate = generation.candidate.unwrap();
        assert_eq!(candidate.text, "Madrid.");
        assert_eq!(candidate.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_parse_content_filter_and_refusal() {
        let filtered = r#"{"choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]}"#;
        let candidate = parse_completion(filtered).unwrap().candidate.unwrap();
        assert_eq!(candidate.finish_reason, Some(FinishReason::Safety));
        assert!(candidate.text.is_empty());

        let refused = r#"{"choices": [{"message": {"content": null, "refusal": "I can't help with that."}, "finish_reason": "stop"}]}"#;
        let candidate = parse_completion(refused).unwrap().candidate.unwrap();
        assert_eq!(candidate.finish_reason, Some(FinishReason::Refusal));
    }

    #[test]
    fn test_parse_without_choices() {
        let generation = parse_completion(r#"{"choices": []}"#).unwrap();
        assert!(generation.candidate.is_none());
        assert!(generation.prompt_feedback.is_none());
    }
}
