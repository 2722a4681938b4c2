use groundwater_core::ProviderError;
use thiserror::Error;

/// Why a survey analysis did not produce a result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Only `image/*` and `application/pdf` are analyzed.
    #[error("Unsupported file type: {0}. Upload an image or a PDF.")]
    UnsupportedFileType(String),

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The model answered, but not with JSON. `raw` is the reply verbatim.
    #[error("Failed to parse AI response as JSON: {reason}")]
    Unparsable { raw: String, reason: String },
}

impl AnalysisError {
    /// Short name of the pipeline stage that failed, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedFileType(_) | AnalysisError::EmptyFile => "validation",
            AnalysisError::Provider(_) => "provider",
            AnalysisError::Unparsable { .. } => "parse",
        }
    }
}
