//! Groundwater HTTP API
//!
//! Survey analysis relay, in-memory accounts, quota checks, and payment verification.

pub mod access;
pub mod analyze;
pub mod auth;
pub mod error;
pub mod health_api;
pub mod server;

pub use error::GatewayError;
pub use server::{build_router, start_server, GatewayState, ServerInfo};
