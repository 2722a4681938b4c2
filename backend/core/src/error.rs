use thiserror::Error;

/// Failures talking to the external AI provider.
///
/// None of these are retried; every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("AI provider API key is not configured")]
    MissingCredential,

    #[error("AI provider request failed: {0}")]
    Transport(String),

    #[error("AI provider did not respond within {0}s")]
    Timeout(u64),

    #[error("AI provider returned {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("AI provider returned a malformed body: {0}")]
    MalformedResponse(String),

    #[error("AI provider response contained no content")]
    EmptyContent,
}

/// Failures in the account, quota, and payment layer.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    MissingFields(String),

    #[error("User already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Payment signature verification failed")]
    InvalidSignature,

    #[error("Daily analysis limit reached")]
    QuotaExhausted,

    #[error("storage error: {0}")]
    Storage(String),
}
