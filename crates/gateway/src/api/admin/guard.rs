//! Bearer-token extractors for the admin and cron endpoint groups.
//!
//! Handlers opt in by adding `_guard: AdminGuard` or `_guard: CronGuard`
//! to their parameter list.  When the matching token is not configured
//! (dev mode), all requests pass.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Response;

use crate::api::auth::bearer_matches;
use crate::api::error::api_error;
use crate::state::AppState;

/// Axum extractor that enforces the admin bearer token.
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match &state.admin_token_hash {
            Some(expected) if !bearer_matches(&parts.headers, expected) => Err(api_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid admin token",
            )),
            _ => Ok(AdminGuard),
        }
    }
}

/// Axum extractor that enforces the cron secret used by external
/// schedulers to trigger sweeps.
pub struct CronGuard;

#[async_trait]
impl FromRequestParts<AppState> for CronGuard {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match &state.cron_secret_hash {
            Some(expected) if !bearer_matches(&parts.headers, expected) => Err(api_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid cron secret",
            )),
            _ => Ok(CronGuard),
        }
    }
}
