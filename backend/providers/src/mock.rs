use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use groundwater_core::{LlmProvider, LlmRequest, LlmResponse, ProviderError};

/// What the mock answers with.
enum MockReply {
    Content(String),
    Status { status: u16, body: String },
    Empty,
}

/// An LLM provider that returns canned responses and records every request.
pub struct MockProvider {
    name: String,
    reply: MockReply,
    calls: AtomicUsize,
    last_request: Mutex<Option<LlmRequest>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: MockReply::Content("Mock response".to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.reply = MockReply::Content(response.into());
        self
    }

    /// Answer every call with an upstream error status.
    pub fn with_status(mut self, status: u16, body: impl Into<String>) -> Self {
        self.reply = MockReply::Status {
            status,
            body: body.into(),
        };
        self
    }

    /// Answer every call with a reply that carries no content.
    pub fn with_empty_reply(mut self) -> Self {
        self.reply = MockReply::Empty;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, req: &LlmRequest) -> Result<LlmResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(req.clone());
        }

        match &self.reply {
            MockReply::Content(content) => Ok(LlmResponse {
                content: content.clone(),
                provider: self.name.clone(),
                model: req.model.clone(),
                tokens_used: 0,
                latency_ms: 0,
            }),
            MockReply::Status { status, body } => Err(ProviderError::UpstreamStatus {
                status: *status,
                body: body.clone(),
            }),
            MockReply::Empty => Err(ProviderError::EmptyContent),
        }
    }
}
