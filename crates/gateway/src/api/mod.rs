pub mod admin;
pub mod auth;
pub mod channels;
pub mod crons;
pub mod error;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required), **protected**
/// (gated behind the API bearer-token middleware) and **operator** routes
/// that carry their own extractor guards (`AdminGuard`, `CronGuard`).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/v1/health", get(admin::health));

    let protected = Router::new()
        .route("/v1/channels/publish", post(channels::publish))
        .route("/v1/channels/join", post(channels::join))
        .route("/v1/channels/online", get(channels::online))
        .route("/v1/channels/:id", get(channels::get_channel))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    let operator = Router::new()
        .route("/v1/crons/reap", post(crons::reap))
        .route("/v1/admin/channels/:id", delete(admin::delete_channel));

    public.merge(protected).merge(operator)
}
