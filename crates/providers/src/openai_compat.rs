//! OpenAI-compatible chat and embedding client.
//!
//! Ollama, vLLM, llama.cpp server, OpenAI and OpenRouter all expose the
//! same `/chat/completions`, `/embeddings` and `/models` endpoints.
//! Completions are single-shot; the pipeline never streams.

use std::time::Duration;

use async_trait::async_trait;
use bariatric_core::error::ProviderError;
use bariatric_core::message::{Message, Role};
use bariatric_core::provider::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Seconds to back off when the server rate-limits without saying how long.
const RATE_LIMIT_BACKOFF_SECS: u64 = 5;

pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// POST `body` to `path` and decode the JSON answer.
    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, path, status, body = %body, "Provider returned error");
            return Err(status_error(status, body));
        }

        response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: status,
            message: format!("unreadable {path} response: {e}"),
        })
    }
}

fn send_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited {
            retry_after_secs: RATE_LIMIT_BACKOFF_SECS,
        },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => ProviderError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl bariatric_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let reply: ChatReply = self
            .post("chat/completions", &ChatBody::from_request(&request))
            .await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "completion carried no choices".into(),
            })?;

        Ok(ProviderResponse {
            message: Message::assistant(content),
            usage: reply.usage,
            model: reply.model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(send_error)?;
        Ok(response.status().is_success())
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let body = EmbedBody {
            model: &request.model,
            input: &request.inputs,
            encoding_format: "float",
        };
        let reply: EmbedReply = self.post("embeddings", &body).await?;

        Ok(EmbeddingResponse {
            embeddings: reply.data.into_iter().map(|d| d.embedding).collect(),
            model: reply.model,
        })
    }
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

impl<'a> ChatBody<'a> {
    fn from_request(request: &'a ProviderRequest) -> Self {
        Self {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            stream: false,
            max_tokens: request.max_tokens,
            stop: (!request.stop.is_empty()).then_some(request.stop.as_slice()),
        }
    }
}

/// Only role and content go over the wire.
#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedBody<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedReply {
    data: Vec<EmbedDatum>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bariatric_core::Provider;

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("vllm", "http://localhost:8000/v1/", "");
        assert_eq!(provider.name(), "vllm");
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
        assert_eq!(
            provider.endpoint("chat/completions"),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn chat_body_carries_only_role_and_content() {
        let request = ProviderRequest {
            model: "llama3.2:3b".into(),
            messages: vec![
                Message::system("You are a bariatric nutrition assistant"),
                Message::user("Can I have rice?"),
            ],
            temperature: 0.2,
            max_tokens: None,
            stop: Vec::new(),
        };

        let body = serde_json::to_value(ChatBody::from_request(&request)).unwrap();
        assert_eq!(body["model"], "llama3.2:3b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Can I have rice?");
        assert!(body["messages"][1].get("id").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn chat_body_includes_limits_when_set() {
        let request = ProviderRequest {
            model: "m".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.0,
            max_tokens: Some(256),
            stop: vec!["</answer>".into()],
        };

        let body = serde_json::to_value(ChatBody::from_request(&request)).unwrap();
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stop"][0], "</answer>");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error(429, String::new()),
            ProviderError::RateLimited {
                retry_after_secs: RATE_LIMIT_BACKOFF_SECS
            }
        ));
        assert!(matches!(
            status_error(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            status_error(500, "boom".into()),
            ProviderError::ApiError { status_code: 500, .. }
        ));
    }

    #[test]
    fn parse_chat_reply() {
        let data = r#"{"model":"llama3.2:3b","choices":[{"message":{"role":"assistant","content":"Sip slowly."}}],"usage":{"prompt_tokens":10,"completion_tokens":3,"total_tokens":13}}"#;
        let parsed: ChatReply = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Sip slowly."));
        assert_eq!(parsed.usage.unwrap().total_tokens, 13);

        let null_content = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatReply = serde_json::from_str(null_content).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.model.is_empty());
    }

    #[test]
    fn parse_embed_reply() {
        let data = r#"{"data":[{"embedding":[0.1,0.2,0.3]}],"model":"nomic-embed-text"}"#;
        let parsed: EmbedReply = serde_json::from_str(data).unwrap();
        assert_eq!(parsed.data[0].embedding.len(), 3);
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let provider = OpenAiCompatProvider::with_timeout(
            "ollama",
            "http://127.0.0.1:9/v1",
            "",
            Duration::from_secs(1),
        );
        let err = provider
            .embed(EmbeddingRequest {
                model: "nomic-embed-text".into(),
                inputs: vec!["broth".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Network(_) | ProviderError::Timeout(_)
        ));
    }
}
