//! API authentication middleware.
//!
//! The API token is resolved **once at startup** (config value first, then
//! the env var named by `server.api_token_env`) and its SHA-256 digest is
//! cached in `AppState`.
//! - If a token is configured, every protected request must carry
//!   `Authorization: Bearer <token>`.
//! - Otherwise the server logs a warning once at boot and allows
//!   unauthenticated access (dev mode).

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::api::error::api_error;
use crate::state::AppState;

/// Whether the request's bearer token matches `expected_hash`.
///
/// Hashes the provided token to a fixed-length digest, then compares in
/// constant time so the token length does not leak.
pub fn bearer_matches(headers: &HeaderMap, expected_hash: &[u8]) -> bool {
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");
    let provided_hash = Sha256::digest(provided.as_bytes());
    bool::from(provided_hash.ct_eq(expected_hash))
}

/// Axum middleware that enforces bearer-token authentication on protected
/// routes. Attach via `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = &state.api_token_hash {
        if !bearer_matches(req.headers(), expected) {
            return api_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid or missing API token",
            );
        }
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert("authorization", HeaderValue::from_str(auth).unwrap());
        h
    }

    #[test]
    fn matching_token_passes() {
        let expected = Sha256::digest(b"tok").to_vec();
        assert!(bearer_matches(&headers("Bearer tok"), &expected));
    }

    #[test]
    fn wrong_or_missing_token_fails() {
        let expected = Sha256::digest(b"tok").to_vec();
        assert!(!bearer_matches(&headers("Bearer nope"), &expected));
        assert!(!bearer_matches(&headers("tok"), &expected));
        assert!(!bearer_matches(&HeaderMap::new(), &expected));
    }
}
