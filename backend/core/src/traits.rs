use async_trait::async_trait;

use crate::error::{AccountError, ProviderError};
use crate::types::{AccessRecord, User};

/// Trait for the hosted AI model the survey analyzer talks to.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openrouter", "mock").
    fn name(&self) -> &str;

    /// Send a completion request and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, ProviderError>;
}

/// An image sent inline with a prompt.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub mime_type: String,
    /// Standard base64, no data-URL prefix.
    pub base64_data: String,
}

impl ImageAttachment {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Images attached to the user turn. Empty for text-only prompts.
    pub images: Vec<ImageAttachment>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

/// Storage for registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert `user` unless its email is already registered.
    ///
    /// The existence check and the insert are one atomic step; a second
    /// registration of the same email fails with [`AccountError::EmailTaken`].
    async fn insert_if_absent(&self, user: User) -> Result<User, AccountError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AccountError>;

    async fn count(&self) -> Result<usize, AccountError>;
}

/// Mutation applied to an access record in place.
pub type AccessUpdate<'a> = &'a (dyn Fn(&mut AccessRecord) + Send + Sync);

/// Storage for per-user access records.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    async fn insert(&self, user_id: &str, record: AccessRecord) -> Result<(), AccountError>;

    async fn get(&self, user_id: &str) -> Result<Option<AccessRecord>, AccountError>;

    /// Apply `update` atomically and return the new record, or `None` for an unknown user.
    async fn update(
        &self,
        user_id: &str,
        update: AccessUpdate<'_>,
    ) -> Result<Option<AccessRecord>, AccountError>;
}
