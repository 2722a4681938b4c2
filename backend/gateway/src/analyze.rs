//! `POST /api/analyze-survey`.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use groundwater_analysis::{AnalysisError, SurveyUpload};
use groundwater_core::{AccountError, SurveyFileKind, resolve_mime_type};

use crate::error::GatewayError;
use crate::server::GatewayState;

pub const FILE_FIELD: &str = "surveyFile";
pub const USER_ID_FIELD: &str = "user_id";
pub const EXTRACTED_TEXT_FIELD: &str = "extractedText";

const DEFAULT_FILE_NAME: &str = "survey";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub survey_analysis: Value,
    pub file_name: String,
    pub file_type: String,
}

fn upload_error(e: MultipartError, limit_bytes: usize) -> GatewayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::FileTooLarge {
            limit_mb: limit_bytes / (1024 * 1024),
        }
    } else {
        GatewayError::InvalidUpload(e.body_text())
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Pull the survey file and its side fields out of the multipart body.
async fn read_upload(multipart: &mut Multipart, limit_bytes: usize) -> Result<SurveyUpload, GatewayError> {
    let mut file = None;
    let mut user_id = None;
    let mut extracted_text = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FILE_FIELD => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
                let mime_type = resolve_mime_type(field.content_type(), &file_name);
                let data = field.bytes().await.map_err(|e| upload_error(e, limit_bytes))?;
                if data.len() > limit_bytes {
                    return Err(GatewayError::FileTooLarge {
                        limit_mb: limit_bytes / (1024 * 1024),
                    });
                }
                file = Some((file_name, mime_type, data));
            }
            USER_ID_FIELD | "userId" => {
                let text = field.text().await.map_err(|e| upload_error(e, limit_bytes))?;
                user_id = non_empty(text);
            }
            EXTRACTED_TEXT_FIELD => {
                let text = field.text().await.map_err(|e| upload_error(e, limit_bytes))?;
                extracted_text = non_empty(text);
            }
            other => warn!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let (file_name, mime_type, data) = file.ok_or(GatewayError::MissingFile)?;
    Ok(SurveyUpload {
        file_name,
        mime_type,
        data,
        extracted_text,
        user_id,
    })
}

/// Handler for `POST /api/analyze-survey`.
///
/// When a `user_id` is supplied one analysis is reserved from the daily quota
/// before the provider call and handed back if the analysis fails.
pub async fn analyze_survey(
    State(state): State<GatewayState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, GatewayError> {
    let upload = read_upload(&mut multipart, state.info.max_upload_bytes).await?;

    // Wrong file types are refused before touching the quota.
    if SurveyFileKind::from_mime(&upload.mime_type).is_none() {
        return Err(AnalysisError::UnsupportedFileType(upload.mime_type).into());
    }

    let reservation = match upload.user_id.as_deref() {
        Some(user_id) => match state.accounts.reserve_analysis(user_id).await {
            Ok(reservation) => Some(reservation),
            Err(AccountError::QuotaExhausted) => {
                let access = state.accounts.check_access(user_id).await?;
                return Err(GatewayError::QuotaExhausted(access));
            }
            Err(AccountError::UserNotFound(id)) => return Err(GatewayError::UnknownUser(id)),
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let analysis = match state.analyzer.analyze(&upload).await {
        Ok(analysis) => analysis,
        Err(e) => {
            if let Some(reservation) = &reservation {
                if let Err(release_err) = state.accounts.release_analysis(reservation).await {
                    warn!(user_id = %reservation.user_id, error = %release_err, "Failed to release quota reservation");
                }
            }
            return Err(e.into());
        }
    };

    if let Some(reservation) = &reservation {
        info!(
            user_id = %reservation.user_id,
            analysis_count = reservation.access.analysis_count,
            "Charged analysis against daily quota"
        );
    }

    Ok(Json(AnalyzeResponse {
        success: true,
        survey_analysis: analysis.result,
        file_name: upload.file_name,
        file_type: upload.mime_type,
    }))
}
