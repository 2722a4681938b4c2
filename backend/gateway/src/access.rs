//! Quota lookups and subscription activation.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::Serialize;
use tracing::info;

use groundwater_accounts::PaymentConfirmation;
use groundwater_core::AccessSnapshot;

use crate::error::GatewayError;
use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub access: AccessSnapshot,
}

/// Handler for `GET /api/check-access/:user_id`. Advisory only; the analyze
/// endpoint enforces the quota itself.
pub async fn check_access(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> Result<Json<AccessResponse>, GatewayError> {
    let access = state.accounts.check_access(&user_id).await?;
    Ok(Json(AccessResponse {
        success: true,
        message: None,
        access,
    }))
}

/// Handler for `POST /api/verify-payment`
pub async fn verify_payment(
    State(state): State<GatewayState>,
    payload: Result<Json<PaymentConfirmation>, JsonRejection>,
) -> Result<Json<AccessResponse>, GatewayError> {
    let Json(confirmation) = payload?;
    let access = state.accounts.verify_payment(&confirmation).await?;
    info!(
        user_id = %confirmation.user_id,
        verifier = state.accounts.verifier_name(),
        "Payment verified"
    );
    Ok(Json(AccessResponse {
        success: true,
        message: Some("Payment verified. Subscription is now active.".into()),
        access,
    }))
}
