//! Generative text model port and its OpenAI-compatible HTTP adapter.
//!
//! The pipeline only ever sees [`TextModel`]; [`ChatCompletionsClient`] is the
//! production implementation speaking `POST {base}/chat/completions`, which
//! covers OpenAI, OpenRouter and most self-hosted gateways.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use ecoscout_shared::{AppConfig, EcoscoutError, Result, validate_api_key};

/// User-Agent string for model requests.
const USER_AGENT: &str = concat!("ecoscout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A single-shot prompt: one system instruction, one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// What the model returned, plus usage for logging.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub latency_ms: u64,
}

/// Anything that can turn a prompt into text.
pub trait TextModel: Send + Sync {
    /// Run one completion. No streaming, no retries.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Completion>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Settings for [`ChatCompletionsClient`].
#[derive(Clone)]
pub struct ChatCompletionsOptions {
    /// API root; `/chat/completions` is appended.
    pub base_url: Url,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: Option<f32>,
}

impl ChatCompletionsOptions {
    /// Build options from config, resolving the API key from its env var.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.llm.base_url.clone(),
            api_key: validate_api_key(config)?,
            model: config.llm.model.clone(),
            timeout_secs: config.llm.timeout_secs,
            temperature: config.llm.temperature,
        })
    }
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl ChatCompletionsClient {
    pub fn new(opts: ChatCompletionsOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| EcoscoutError::Network(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!(
            "{}/chat/completions",
            opts.base_url.as_str().trim_end_matches('/')
        );

        Ok(Self {
            client,
            endpoint,
            api_key: opts.api_key,
            model: opts.model,
            temperature: opts.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextModel for ChatCompletionsClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let start = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
        };

        debug!(endpoint = %self.endpoint, prompt_chars = request.user.len(), "sending completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EcoscoutError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EcoscoutError::Model(format!("failed to read body: {e}")))?;

        if !status.is_success() {
            let excerpt: String = text.chars().take(500).collect();
            return Err(EcoscoutError::Model(format!(
                "HTTP {}: {excerpt}",
                status.as_u16()
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| EcoscoutError::Model(format!("invalid response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EcoscoutError::Model("response contained no message content".into()))?;

        let usage = parsed.usage.unwrap_or(Usage {
            prompt_tokens: 0,
            completion_tokens: 0,
        });

        let completion = Completion {
            text: content,
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            latency_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            tokens_in = completion.tokens_in,
            tokens_out = completion.tokens_out,
            latency_ms = completion.latency_ms,
            "completion received"
        );

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatCompletionsClient {
        ChatCompletionsClient::new(ChatCompletionsOptions {
            base_url: Url::parse(&format!("{}/v1", server.uri())).unwrap(),
            api_key: "sk-test".into(),
            model: "test-model".into(),
            timeout_secs: 5,
            temperature: None,
        })
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You are helpful.".into(),
            user: "Plan something.".into(),
        }
    }

    #[test]
    fn request_serializes_system_then_user() {
        let req = request();
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: &req.system,
                },
                ChatMessage {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Plan something.");
        assert!(json.get("temperature").is_none());
    }

    #[tokio::test]
    async fn completion_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "test-model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "test-model-2024",
                "choices": [{ "message": { "role": "assistant", "content": "# Plan" } }],
                "usage": { "prompt_tokens": 120, "completion_tokens": 30 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = client_for(&server).complete(&request()).await.unwrap();
        assert_eq!(completion.text, "# Plan");
        assert_eq!(completion.model, "test-model-2024");
        assert_eq!(completion.tokens_in, 120);
        assert_eq!(completion.tokens_out, 30);
    }

    #[tokio::test]
    async fn non_success_is_model_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, EcoscoutError::Model(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn empty_choices_is_model_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }
}
