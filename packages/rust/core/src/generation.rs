//! Text-completion capability used by the transformation engine.
//!
//! [`CompletionClient`] is the seam: the batch pass only ever sees a prompt
//! going in and text (or an error) coming out. [`ChatCompletionClient`] talks
//! to any OpenAI-compatible `/chat/completions` endpoint (DeepSeek by default).

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use feedmill_shared::{FeedmillError, GenerationConfig, Result};

/// A black-box text-completion service.
pub trait CompletionClient {
    /// Complete `prompt`, returning the raw reply text.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are a professional technical translator and editor. \
Follow the output format exactly and do not add commentary.";

// ---------------------------------------------------------------------------
// ChatCompletionClient
// ---------------------------------------------------------------------------

/// [`CompletionClient`] over an OpenAI-compatible chat API.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl ChatCompletionClient {
    pub fn new(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedmillError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionClient for ChatCompletionClient {
    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(FeedmillError::Generation(format!(
                "HTTP {status} from {}: {snippet}",
                self.endpoint
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FeedmillError::Generation("response contained no completion".into()))?;

        debug!(reply_len = text.len(), "completion received");
        Ok(text)
    }
}

impl ChatCompletionClient {
    fn transport_error(&self, e: reqwest::Error) -> FeedmillError {
        if e.is_timeout() {
            FeedmillError::Generation(format!("request timed out after {:?}", self.timeout))
        } else {
            FeedmillError::Generation(format!("request to {} failed: {e}", self.endpoint))
        }
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout_secs: u64) -> ChatCompletionClient {
        let config = GenerationConfig {
            base_url: format!("{}/", server.uri()),
            timeout_secs,
            ..Default::default()
        };
        ChatCompletionClient::new(&config, "sk-test").unwrap()
    }

    #[tokio::test]
    async fn returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server, 5).complete("say hello").await.unwrap();
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn rate_limit_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client(&server, 5).complete("x").await.unwrap_err();
        assert!(matches!(err, FeedmillError::Generation(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn empty_choices_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = client(&server, 5).complete("x").await.unwrap_err();
        assert!(err.to_string().contains("no completion"));
    }

    #[tokio::test]
    async fn timeout_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(serde_json::json!({
                        "choices": [{ "message": { "content": "late" } }]
                    })),
            )
            .mount(&server)
            .await;

        let err = client(&server, 1).complete("x").await.unwrap_err();
        assert!(matches!(err, FeedmillError::Generation(_)));
        assert!(err.to_string().contains("timed out"));
    }
}
