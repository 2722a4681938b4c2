//! Payment confirmation checks.
//!
//! Razorpay signs a completed checkout as
//! `hex(HMAC_SHA256(key_secret, "{order_id}|{payment_id}"))`.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

/// What the client posts after checkout completes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub signature: String,
}

pub trait PaymentVerifier: Send + Sync {
    fn name(&self) -> &str;

    fn verify(&self, confirmation: &PaymentConfirmation) -> bool;
}

/// Approves every confirmation without looking at it.
pub struct StubVerifier;

impl PaymentVerifier for StubVerifier {
    fn name(&self) -> &str {
        "stub"
    }

    fn verify(&self, _confirmation: &PaymentConfirmation) -> bool {
        true
    }
}

/// Checks the Razorpay checkout signature against the account's key secret.
pub struct RazorpayVerifier {
    key_secret: String,
}

impl RazorpayVerifier {
    pub fn new(key_secret: impl Into<String>) -> Self {
        Self {
            key_secret: key_secret.into(),
        }
    }

    pub fn expected_signature(&self, order_id: &str, payment_id: &str) -> Option<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.key_secret.as_bytes()).ok()?;
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

impl PaymentVerifier for RazorpayVerifier {
    fn name(&self) -> &str {
        "razorpay"
    }

    fn verify(&self, confirmation: &PaymentConfirmation) -> bool {
        if confirmation.order_id.is_empty() || confirmation.payment_id.is_empty() {
            return false;
        }
        let Ok(given) = hex::decode(confirmation.signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(self.key_secret.as_bytes()) else {
            return false;
        };
        mac.update(format!("{}|{}", confirmation.order_id, confirmation.payment_id).as_bytes());
        mac.verify_slice(&given).is_ok()
    }
}
