//! Gateway error type and its HTTP mapping.
//!
//! Analysis failures answer with `{success: false, error, ...}`; account
//! failures, including unreadable JSON bodies, with `{success: false, message}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

use groundwater_analysis::AnalysisError;
use groundwater_core::{AccessSnapshot, AccountError, ProviderError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No file uploaded")]
    MissingFile,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("File too large. Maximum size is {limit_mb}MB.")]
    FileTooLarge { limit_mb: usize },

    #[error("Daily analysis limit reached")]
    QuotaExhausted(AccessSnapshot),

    #[error("User not found")]
    UnknownUser(String),

    #[error("Invalid request body: {}", .0.body_text())]
    InvalidJson(#[from] JsonRejection),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Account(#[from] AccountError),
}

fn failure(error: impl Into<String>) -> Value {
    json!({ "success": false, "error": error.into() })
}

impl GatewayError {
    fn status_and_body(&self) -> (StatusCode, Value) {
        match self {
            GatewayError::MissingFile | GatewayError::InvalidUpload(_) => {
                (StatusCode::BAD_REQUEST, failure(self.to_string()))
            }
            GatewayError::FileTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, failure(self.to_string()))
            }
            GatewayError::QuotaExhausted(access) => (
                StatusCode::FORBIDDEN,
                json!({
                    "success": false,
                    "error": self.to_string(),
                    "access": access,
                }),
            ),
            GatewayError::UnknownUser(_) => (StatusCode::NOT_FOUND, failure(self.to_string())),
            GatewayError::InvalidJson(rejection) => (
                rejection.status(),
                json!({ "success": false, "message": self.to_string() }),
            ),
            GatewayError::Analysis(e) => analysis_response(e),
            GatewayError::Account(e) => account_response(e),
        }
    }
}

fn analysis_response(err: &AnalysisError) -> (StatusCode, Value) {
    match err {
        AnalysisError::UnsupportedFileType(_) | AnalysisError::EmptyFile => {
            (StatusCode::BAD_REQUEST, failure(err.to_string()))
        }
        AnalysisError::Provider(ProviderError::MissingCredential) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            failure("OpenRouter API key not configured"),
        ),
        AnalysisError::Provider(ProviderError::UpstreamStatus { status, body }) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "success": false,
                "error": "AI provider request failed",
                "status": status,
                "details": body,
            }),
        ),
        AnalysisError::Provider(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "success": false,
                "error": "AI provider request failed",
                "details": e.to_string(),
            }),
        ),
        AnalysisError::Unparsable { raw, reason } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({
                "success": false,
                "error": "Failed to parse AI response",
                "details": reason,
                "rawResponse": raw,
            }),
        ),
    }
}

fn account_response(err: &AccountError) -> (StatusCode, Value) {
    let status = match err {
        AccountError::MissingFields(_)
        | AccountError::EmailTaken
        | AccountError::InvalidSignature => StatusCode::BAD_REQUEST,
        AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AccountError::UserNotFound(_) => StatusCode::NOT_FOUND,
        AccountError::QuotaExhausted => StatusCode::FORBIDDEN,
        AccountError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = match err {
        AccountError::UserNotFound(_) => "User not found".to_string(),
        AccountError::Storage(_) => "Internal server error".to_string(),
        other => other.to_string(),
    };
    (status, json!({ "success": false, "message": message }))
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundwater_core::SubscriptionStatus;

    #[test]
    fn test_upstream_status_carries_diagnostics() {
        let err = GatewayError::from(AnalysisError::Provider(ProviderError::UpstreamStatus {
            status: 401,
            body: "{\"error\":\"No auth credentials found\"}".into(),
        }));
        let (status, body) = err.status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 401);
        assert!(body["details"].as_str().unwrap().contains("No auth"));
    }

    #[test]
    fn test_unparsable_carries_raw_response() {
        let err = GatewayError::from(AnalysisError::Unparsable {
            raw: "sorry".into(),
            reason: "expected value".into(),
        });
        let (_, body) = err.status_and_body();
        assert_eq!(body["rawResponse"], "sorry");
    }

    #[test]
    fn test_quota_exhausted_includes_access() {
        let err = GatewayError::QuotaExhausted(AccessSnapshot {
            subscription_status: SubscriptionStatus::None,
            analysis_count: 1,
            daily_limit: 1,
            has_access: false,
        });
        let (status, body) = err.status_and_body();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["access"]["has_access"], false);
    }

    #[test]
    fn test_account_errors_use_message_key() {
        let (status, body) = GatewayError::from(AccountError::InvalidCredentials).status_and_body();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
        assert_eq!(body["success"], false);
    }
}
