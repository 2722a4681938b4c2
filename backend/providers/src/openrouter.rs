use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use groundwater_core::{LlmProvider, LlmRequest, LlmResponse, ProviderError};
use logging::redact_sensitive_data;

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter.ai chat-completions provider.
///
/// Built without an API key it still answers, but every call fails with
/// [`ProviderError::MissingCredential`] before touching the network.
pub struct OpenRouterProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    app_title: Option<String>,
}

impl OpenRouterProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: OPENROUTER_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            app_title: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sent as `X-Title` so requests are attributed on the OpenRouter dashboard.
    pub fn with_app_title(mut self, title: impl Into<String>) -> Self {
        self.app_title = Some(title.into());
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

/// Plain text for text-only turns, typed parts when images are attached.
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

fn build_messages(request: &LlmRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::new();
    if !request.system_prompt.is_empty() {
        messages.push(ChatMessage {
            role: "system",
            content: MessageContent::Text(request.system_prompt.clone()),
        });
    }

    let content = if request.images.is_empty() {
        MessageContent::Text(request.user_prompt.clone())
    } else {
        let mut parts = vec![ContentPart::Text {
            text: request.user_prompt.clone(),
        }];
        parts.extend(request.images.iter().map(|image| ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: image.data_url(),
            },
        }));
        MessageContent::Parts(parts)
    };
    messages.push(ChatMessage {
        role: "user",
        content,
    });
    messages
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::MissingCredential)?;
        let start = Instant::now();

        let body = ChatRequest {
            model: request.model.clone(),
            messages: build_messages(request),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
        };

        debug!(
            model = %request.model,
            images = request.images.len(),
            "Sending request to OpenRouter"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body);
        if let Some(title) = &self.app_title {
            builder = builder.header("X-Title", title);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout.as_secs())
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = %status, body = %redact_sensitive_data(&text), "OpenRouter returned an error");
            return Err(ProviderError::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("{e}: {}", redact_sensitive_data(&text))))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)?;

        let tokens_used = chat_response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or(0);

        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(LlmResponse {
            content,
            provider: "openrouter".to_string(),
            model: chat_response.model.unwrap_or_else(|| request.model.clone()),
            tokens_used,
            latency_ms,
        })
    }
}
