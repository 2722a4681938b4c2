pub mod error;
pub mod mime;
pub mod traits;
pub mod types;

pub use error::{AccountError, ProviderError};
pub use mime::{detect_mime_type, resolve_mime_type};
pub use traits::{
    AccessRepository, AccessUpdate, ImageAttachment, LlmProvider, LlmRequest, LlmResponse,
    UserRepository,
};
pub use types::{
    AccessRecord, AccessSnapshot, SubscriptionStatus, SurveyFileKind, User, UserProfile,
    DAILY_ANALYSIS_LIMIT, MAX_UPLOAD_BYTES,
};
