//! Registration, login, quota checks, and subscription activation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use groundwater_core::{
    AccessRecord, AccessRepository, AccessSnapshot, AccountError, SubscriptionStatus, User,
    UserProfile, UserRepository,
};

use crate::memory::{InMemoryAccessRepository, InMemoryUserRepository};
use crate::payment::{PaymentConfirmation, PaymentVerifier, StubVerifier};

pub const DEFAULT_USER_NAME: &str = "User";

/// Returns the current UTC day. Swappable so tests can cross midnight.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// One analysis taken from a user's daily quota.
#[derive(Debug, Clone)]
pub struct QuotaReservation {
    pub user_id: String,
    pub day: NaiveDate,
    /// Access state right after the reservation.
    pub access: AccessSnapshot,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    access: Arc<dyn AccessRepository>,
    verifier: Arc<dyn PaymentVerifier>,
    clock: Clock,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        access: Arc<dyn AccessRepository>,
        verifier: Arc<dyn PaymentVerifier>,
    ) -> Self {
        Self {
            users,
            access,
            verifier,
            clock: Arc::new(utc_today),
        }
    }

    /// Fresh in-memory stores with the given verifier.
    pub fn in_memory(verifier: Arc<dyn PaymentVerifier>) -> Self {
        Self::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryAccessRepository::new()),
            verifier,
        )
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn verifier_name(&self) -> &str {
        self.verifier.name()
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<(UserProfile, AccessSnapshot), AccountError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields(
                "Email and password are required".into(),
            ));
        }
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_USER_NAME);

        let user = self
            .users
            .insert_if_absent(User::new(email, password, name))
            .await?;
        let record = AccessRecord::new(self.today());
        self.access.insert(&user.id, record.clone()).await?;

        info!(user_id = %user.id, "Registered user");
        Ok((user.profile(), record.snapshot()))
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserProfile, AccessSnapshot), AccountError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields(
                "Email and password are required".into(),
            ));
        }
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|u| u.password == password)
            .ok_or(AccountError::InvalidCredentials)?;

        let access = self.check_access(&user.id).await?;
        Ok((user.profile(), access))
    }

    /// Current access state, with the daily counter rolled over first.
    pub async fn check_access(&self, user_id: &str) -> Result<AccessSnapshot, AccountError> {
        let today = self.today();
        self.access
            .update(user_id, &|r: &mut AccessRecord| r.roll_over(today))
            .await?
            .map(|r| r.snapshot())
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))
    }

    /// Take one analysis from today's quota, or refuse when none is left.
    ///
    /// Rollover, check, and increment happen under one repository update, so
    /// concurrent requests cannot overspend the quota.
    pub async fn reserve_analysis(&self, user_id: &str) -> Result<QuotaReservation, AccountError> {
        let today = self.today();
        let granted = AtomicBool::new(false);
        let record = self
            .access
            .update(user_id, &|r: &mut AccessRecord| {
                r.roll_over(today);
                if r.has_access() {
                    r.analysis_count = r.analysis_count.saturating_add(1);
                    granted.store(true, Ordering::SeqCst);
                }
            })
            .await?
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))?;

        if !granted.load(Ordering::SeqCst) {
            return Err(AccountError::QuotaExhausted);
        }
        Ok(QuotaReservation {
            user_id: user_id.to_string(),
            day: today,
            access: record.snapshot(),
        })
    }

    /// Give a reservation back after a failed analysis. A no-op once the day
    /// it was taken on has rolled over.
    pub async fn release_analysis(&self, reservation: &QuotaReservation) -> Result<AccessSnapshot, AccountError> {
        let day = reservation.day;
        self.access
            .update(&reservation.user_id, &|r: &mut AccessRecord| {
                if r.count_date == day {
                    r.analysis_count = r.analysis_count.saturating_sub(1);
                }
            })
            .await?
            .map(|r| r.snapshot())
            .ok_or_else(|| AccountError::UserNotFound(reservation.user_id.clone()))
    }

    /// Check the payment confirmation and mark the subscription active.
    pub async fn verify_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<AccessSnapshot, AccountError> {
        let user_id = confirmation.user_id.trim();
        if user_id.is_empty() {
            return Err(AccountError::MissingFields("user_id is required".into()));
        }
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AccountError::UserNotFound(user_id.to_string()));
        }
        if !self.verifier.verify(confirmation) {
            warn!(user_id, verifier = self.verifier.name(), "Payment signature rejected");
            return Err(AccountError::InvalidSignature);
        }

        let today = self.today();
        let snapshot = self
            .access
            .update(user_id, &|r: &mut AccessRecord| {
                r.roll_over(today);
                r.subscription_status = SubscriptionStatus::Active;
            })
            .await?
            .map(|r| r.snapshot())
            .ok_or_else(|| AccountError::UserNotFound(user_id.to_string()))?;

        info!(user_id, payment_id = %confirmation.payment_id, "Subscription activated");
        Ok(snapshot)
    }

    pub async fn user_count(&self) -> Result<usize, AccountError> {
        self.users.count().await
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::in_memory(Arc::new(StubVerifier))
    }
}
