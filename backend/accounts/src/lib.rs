//! In-memory accounts: users, the daily analysis quota, and payment checks.

pub mod memory;
pub mod payment;
pub mod service;

pub use memory::{InMemoryAccessRepository, InMemoryUserRepository};
pub use payment::{PaymentConfirmation, PaymentVerifier, RazorpayVerifier, StubVerifier};
pub use service::{AccountService, Clock, QuotaReservation, DEFAULT_USER_NAME};
