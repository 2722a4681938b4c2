//! Structured logging for the groundwater survey analyzer.
//!
//! Handles subscriber setup, secret redaction, and per-request analysis events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{AnalysisEvent, AnalysisEventLogger, EventLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
