//! `POST /api/register` and `POST /api/login`.
//!
//! Passwords are stored and compared as given; there are no sessions or tokens.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};

use groundwater_core::{AccessSnapshot, UserProfile};

use crate::error::GatewayError;
use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: UserProfile,
    pub access: AccessSnapshot,
}

/// Handler for `POST /api/register`
pub async fn register(
    State(state): State<GatewayState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, GatewayError> {
    let Json(req) = payload?;
    let (user, access) = state
        .accounts
        .register(&req.email, &req.password, req.name.as_deref())
        .await?;
    Ok(Json(AccountResponse {
        success: true,
        message: Some("Registration successful".into()),
        user,
        access,
    }))
}

/// Handler for `POST /api/login`
pub async fn login(
    State(state): State<GatewayState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AccountResponse>, GatewayError> {
    let Json(req) = payload?;
    let (user, access) = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(AccountResponse {
        success: true,
        message: None,
        user,
        access,
    }))
}
