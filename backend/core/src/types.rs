use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest survey file accepted by the upload layer and the CLI client.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Analyses a non-subscribed user may run per UTC day.
pub const DAILY_ANALYSIS_LIMIT: u32 = 1;

/// A registered account. Lives only as long as the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            password: password.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    /// The user as returned to clients, without the password.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Subscription state of an account. Serialized as `""` or `"active"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SubscriptionStatus {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "active")]
    Active,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::None => write!(f, "none"),
            SubscriptionStatus::Active => write!(f, "active"),
        }
    }
}

/// Per-user quota and subscription state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRecord {
    pub subscription_status: SubscriptionStatus,
    pub analysis_count: u32,
    pub daily_limit: u32,
    /// UTC day that `analysis_count` belongs to.
    pub count_date: NaiveDate,
}

impl AccessRecord {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            subscription_status: SubscriptionStatus::None,
            analysis_count: 0,
            daily_limit: DAILY_ANALYSIS_LIMIT,
            count_date: today,
        }
    }

    /// Reset the daily counter if `today` is a new day.
    pub fn roll_over(&mut self, today: NaiveDate) {
        if today != self.count_date {
            self.analysis_count = 0;
            self.count_date = today;
        }
    }

    pub fn has_access(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Active
            || self.analysis_count < self.daily_limit
    }

    pub fn snapshot(&self) -> AccessSnapshot {
        AccessSnapshot {
            subscription_status: self.subscription_status,
            analysis_count: self.analysis_count,
            daily_limit: self.daily_limit,
            has_access: self.has_access(),
        }
    }
}

/// The access record as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessSnapshot {
    pub subscription_status: SubscriptionStatus,
    pub analysis_count: u32,
    pub daily_limit: u32,
    pub has_access: bool,
}

/// The kinds of survey file the analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyFileKind {
    Image,
    Pdf,
}

impl SurveyFileKind {
    /// Classify a MIME type; `None` for anything that is not `image/*` or a PDF.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(Self::Image)
        } else if mime == "application/pdf" {
            Some(Self::Pdf)
        } else {
            None
        }
    }
}

impl fmt::Display for SurveyFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurveyFileKind::Image => write!(f, "image"),
            SurveyFileKind::Pdf => write!(f, "pdf"),
        }
    }
}
