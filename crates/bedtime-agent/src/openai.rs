use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::{ChatMessage, ChatModel, ChatOutput, ModelConfig, ModelError, Role};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Error bodies are truncated before they land in logs or results
const MAX_ERROR_BODY: usize = 500;

/// OpenAI-compatible chat completions client
pub struct OpenAiChatModel {
    client: Client,
    base_url: String,
    /// Pre-computed `"Bearer <key>"` header value
    auth_header: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(api_key: Option<&str>) -> Self {
        Self {
            client: Client::new(),
            base_url: OPENAI_API_BASE.to_string(),
            auth_header: api_key
                .filter(|k| !k.trim().is_empty())
                .map(|k| format!("Bearer {}", k.trim())),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request<'a>(messages: &'a [ChatMessage], config: &'a ModelConfig) -> ChatRequest<'a> {
        ChatRequest {
            model: &config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: config
                .json_response
                .then_some(ResponseFormat { r#type: "json_object" }),
        }
    }

    fn extract_output(response: ChatResponse, started: Instant) -> Result<ChatOutput, ModelError> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::MalformedResponse("no message content in choices".into()))?;

        let mut output = ChatOutput::new(content, started.elapsed());
        output.model = response.model;
        if let Some(usage) = response.usage {
            output.prompt_tokens = Some(usage.prompt_tokens);
            output.completion_tokens = Some(usage.completion_tokens);
        }
        Ok(output)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn is_configured(&self) -> bool {
        self.auth_header.is_some()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<ChatOutput, ModelError> {
        let auth_header = self.auth_header.as_ref().ok_or_else(|| {
            ModelError::MissingCredentials("OpenAI API key not set. Set OPENAI_API_KEY.".into())
        })?;

        debug!(
            model = %config.model,
            messages = messages.len(),
            json_response = config.json_response,
            "Sending chat completion"
        );

        let started = Instant::now();
        let request = Self::build_request(messages, config);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", auth_header)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;
        let output = Self::extract_output(body, started)?;

        debug!(
            duration_ms = output.duration.as_millis(),
            completion_tokens = ?output.completion_tokens,
            "Chat completion finished"
        );

        Ok(output)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "model": "gpt-3.5-turbo-0125",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7}
        })
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        assert!(!OpenAiChatModel::new(None).is_configured());
        assert!(!OpenAiChatModel::new(Some("   ")).is_configured());
        assert!(OpenAiChatModel::new(Some("sk-test")).is_configured());
    }

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let model = OpenAiChatModel::new(None).with_base_url("http://localhost:8080/v1/");
        assert_eq!(model.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_request_serializes_json_mode_only_when_asked() {
        let messages = vec![ChatMessage::system("frame"), ChatMessage::user("hi")];
        let plain = ModelConfig::default();
        let json = serde_json::to_value(OpenAiChatModel::build_request(&messages, &plain)).unwrap();
        assert!(json.get("response_format").is_none());
        assert_eq!(json["messages"][0]["role"], "system");

        let strict = ModelConfig::default().with_json_response(true);
        let json = serde_json::to_value(OpenAiChatModel::build_request(&messages, &strict)).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn test_complete_fails_without_key() {
        let model = OpenAiChatModel::new(None);
        let err = model
            .complete(&[ChatMessage::user("hi")], &ModelConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_complete_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-3.5-turbo"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Goodnight, moon.")))
            .expect(1)
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(Some("sk-test")).with_base_url(&server.uri());
        let output = model
            .complete(&[ChatMessage::user("hi")], &ModelConfig::default())
            .await
            .unwrap();

        assert_eq!(output.content, "Goodnight, moon.");
        assert_eq!(output.model.as_deref(), Some("gpt-3.5-turbo-0125"));
        assert_eq!(output.prompt_tokens, Some(42));
        assert_eq!(output.completion_tokens, Some(7));
    }

    #[tokio::test]
    async fn test_complete_surfaces_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(Some("sk-test")).with_base_url(&server.uri());
        let err = model
            .complete(&[ChatMessage::user("hi")], &ModelConfig::default())
            .await
            .unwrap_err();

        match err {
            ModelError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let model = OpenAiChatModel::new(Some("sk-test")).with_base_url(&server.uri());
        let err = model
            .complete(&[ChatMessage::user("hi")], &ModelConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::MalformedResponse(_)));
    }
}
