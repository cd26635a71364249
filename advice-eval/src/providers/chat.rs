//! OpenAI-compatible chat-completion client (Dartmouth Cloud by default)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::traits::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, ProviderError, ProviderResult,
};
use crate::config::ServiceConfig;

const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct";

/// Chat-completion client for any service speaking the `/chat/completions` dialect
pub struct ChatClient {
    api_key: String,
    base_url: String,
    http_client: Client,
    default_model: String,
}

impl ChatClient {
    /// Create a client with the default request timeout
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://chat.dartmouth.edu/api".to_string(),
            http_client: Client::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from the API key variable named in `config`.
    ///
    /// Fails before any request is made when the variable is unset or blank.
    pub fn from_config(config: &ServiceConfig) -> ProviderResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Config(format!(
                    "{} is not set. Add it to your environment or a .env file.",
                    config.api_key_env
                ))
            })?;

        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self::new(api_key)
            .with_base_url(config.base_url.trim_end_matches('/'))
            .with_http_client(http_client))
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set default model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.clone(),
            content: Some(msg.content.clone()),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatError {
    error: ChatErrorDetail,
}

#[derive(Deserialize)]
struct ChatErrorDetail {
    message: String,
}

#[async_trait]
impl LLMProvider for ChatClient {
    fn name(&self) -> &str {
        "dartmouth"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn complete(&self, request: &CompletionRequest) -> ProviderResult<CompletionResponse> {
        let start = Instant::now();

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let body = ChatRequest {
            model,
            messages: request.messages.iter().map(Into::into).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!("POST {}/chat/completions model={}", self.base_url, body.model);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ChatError>(&body) {
                Ok(error) => error.error.message,
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };

            if status == 401 || status == 403 {
                return Err(ProviderError::Config(format!(
                    "auth error ({}): {}",
                    status.as_u16(),
                    message
                )));
            }

            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

        let (input_tokens, output_tokens) = api_response
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model.unwrap_or(body.model),
            input_tokens,
            output_tokens,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_fails_fast() {
        let config = ServiceConfig {
            api_key_env: "ADVICE_EVAL_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ServiceConfig::default()
        };
        let err = ChatClient::from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::Config(ref m) if m.contains("ADVICE_EVAL_TEST_KEY_THAT_IS_NEVER_SET")));
    }

    #[test]
    fn test_request_serialization_skips_missing_temperature() {
        let body = ChatRequest {
            model: "m".to_string(),
            messages: vec![(&Message::user("hi")).into()],
            max_tokens: 750,
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["max_tokens"], 750);
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing_tolerates_missing_usage() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Drink water."},"finish_reason":"stop"}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Drink water."));
    }

    #[test]
    fn test_response_parsing_reads_served_model_and_usage() {
        let raw = r#"{"model":"llama-3.3-70b","choices":[{"message":{"role":"assistant","content":"Rest."},"finish_reason":"length"}],"usage":{"prompt_tokens":42,"completion_tokens":7}}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.model.as_deref(), Some("llama-3.3-70b"));
        let usage = parsed.usage.unwrap();
        assert_eq!((usage.prompt_tokens, usage.completion_tokens), (42, 7));
    }
}
