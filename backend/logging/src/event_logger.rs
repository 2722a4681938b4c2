//! Analysis Event Logger
//!
//! One structured line per stage of a survey analysis, on the
//! `analysis_events` target, so a request can be followed end to end.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisEvent {
    Received {
        file_name: String,
        mime_type: String,
        size_bytes: usize,
        has_extracted_text: bool,
    },
    Completed {
        provider: String,
        model: String,
        tokens_used: u64,
        latency_ms: u64,
    },
    Failed {
        stage: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub request_id: String,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub event: AnalysisEvent,
}

pub struct AnalysisEventLogger;

impl AnalysisEventLogger {
    /// Redact and emit one event.
    pub fn log_event(request_id: &str, user_id: Option<&str>, mut event: AnalysisEvent) {
        if let AnalysisEvent::Failed { error_msg, .. } = &mut event {
            *error_msg = redact_sensitive_data(error_msg);
        }

        let failed = matches!(event, AnalysisEvent::Failed { .. });
        let entry = EventLogEntry {
            request_id: request_id.into(),
            user_id: user_id.map(str::to_string),
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();

        if failed {
            warn!(target: "analysis_events", event = %json, "Survey analysis event");
        } else {
            info!(target: "analysis_events", event = %json, "Survey analysis event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let entry = EventLogEntry {
            request_id: "r1".into(),
            user_id: None,
            timestamp: Utc::now(),
            event: AnalysisEvent::Failed {
                stage: "provider".into(),
                error_msg: "boom".into(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "failed");
        assert_eq!(json["event"]["stage"], "provider");
    }
}
