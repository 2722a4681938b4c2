//! The upload → prompt → provider → parse pipeline.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use groundwater_core::{ImageAttachment, LlmProvider, LlmRequest, SurveyFileKind};
use logging::{AnalysisEvent, AnalysisEventLogger};

use crate::error::AnalysisError;
use crate::parse::extract_json;
use crate::prompts::{image_prompt, pdf_prompt, SYSTEM_PROMPT};

/// One survey file as received from a client.
#[derive(Debug, Clone)]
pub struct SurveyUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
    /// Text the client pulled out of a PDF's text layer, if any.
    pub extracted_text: Option<String>,
    pub user_id: Option<String>,
}

/// Model parameters for every analysis request.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// A successful analysis: the model's JSON, unchanged, plus call metadata.
#[derive(Debug, Clone)]
pub struct SurveyAnalysis {
    pub request_id: String,
    pub kind: SurveyFileKind,
    pub result: Value,
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub latency_ms: u64,
}

pub struct SurveyAnalyzer {
    provider: Arc<dyn LlmProvider>,
    settings: AnalyzerSettings,
}

impl SurveyAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: AnalyzerSettings) -> Self {
        Self { provider, settings }
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Build the provider request for an upload, without sending it.
    pub fn build_request(&self, upload: &SurveyUpload) -> Result<(SurveyFileKind, LlmRequest), AnalysisError> {
        let kind = SurveyFileKind::from_mime(&upload.mime_type)
            .ok_or_else(|| AnalysisError::UnsupportedFileType(upload.mime_type.clone()))?;
        if upload.data.is_empty() {
            return Err(AnalysisError::EmptyFile);
        }

        let (user_prompt, images) = match kind {
            SurveyFileKind::Image => (
                image_prompt(&upload.file_name),
                vec![ImageAttachment {
                    mime_type: upload.mime_type.trim().to_ascii_lowercase(),
                    base64_data: STANDARD.encode(&upload.data),
                }],
            ),
            // The PDF bytes stay on the server.
            SurveyFileKind::Pdf => (
                pdf_prompt(&upload.file_name, upload.extracted_text.as_deref()),
                Vec::new(),
            ),
        };

        Ok((
            kind,
            LlmRequest {
                model: self.settings.model.clone(),
                system_prompt: SYSTEM_PROMPT.to_string(),
                user_prompt,
                images,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            },
        ))
    }

    /// Run one analysis. Every failure is terminal; nothing is retried.
    #[instrument(skip(self, upload), fields(file = %upload.file_name, mime = %upload.mime_type))]
    pub async fn analyze(&self, upload: &SurveyUpload) -> Result<SurveyAnalysis, AnalysisError> {
        let request_id = Uuid::new_v4().to_string();
        let user_id = upload.user_id.as_deref();

        AnalysisEventLogger::log_event(
            &request_id,
            user_id,
            AnalysisEvent::Received {
                file_name: upload.file_name.clone(),
                mime_type: upload.mime_type.clone(),
                size_bytes: upload.data.len(),
                has_extracted_text: upload.extracted_text.is_some(),
            },
        );

        let outcome = self.run(&request_id, upload).await;
        match &outcome {
            Ok(analysis) => AnalysisEventLogger::log_event(
                &request_id,
                user_id,
                AnalysisEvent::Completed {
                    provider: analysis.provider.clone(),
                    model: analysis.model.clone(),
                    tokens_used: analysis.tokens_used,
                    latency_ms: analysis.latency_ms,
                },
            ),
            Err(e) => AnalysisEventLogger::log_event(
                &request_id,
                user_id,
                AnalysisEvent::Failed {
                    stage: e.stage().to_string(),
                    error_msg: e.to_string(),
                },
            ),
        }
        outcome
    }

    async fn run(&self, request_id: &str, upload: &SurveyUpload) -> Result<SurveyAnalysis, AnalysisError> {
        let (kind, request) = self.build_request(upload)?;

        info!(
            kind = %kind,
            provider = %self.provider.name(),
            model = %request.model,
            "Requesting survey analysis"
        );
        let response = self.provider.complete(&request).await?;
        debug!(chars = response.content.len(), "Provider replied");

        let result = extract_json(&response.content)?;

        Ok(SurveyAnalysis {
            request_id: request_id.to_string(),
            kind,
            result,
            provider: response.provider,
            model: response.model,
            tokens_used: response.tokens_used,
            latency_ms: response.latency_ms,
        })
    }
}
