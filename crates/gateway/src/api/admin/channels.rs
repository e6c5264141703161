use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};

use crate::api::error::directory_error;
use crate::state::AppState;

use super::guard::AdminGuard;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DELETE /v1/admin/channels/:id (operator removal, members or not)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn delete_channel(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    // Bulk delete treats a missing id as deleted; confirm it exists first.
    if let Err(e) = state.directory.get_group(&id).await {
        return directory_error(&e);
    }

    let outcome = match state.directory.delete_groups(std::slice::from_ref(&id)).await {
        Ok(o) => o,
        Err(e) => return directory_error(&e),
    };

    if let Some((_, e)) = outcome.failed.first() {
        return directory_error(e);
    }

    tracing::info!(channel_id = %id, "channel deleted by operator");
    Json(serde_json::json!({ "deleted": id })).into_response()
}
