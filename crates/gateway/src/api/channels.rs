//! Channel endpoints: publish, join, online listing and lookup.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use wp_channels::{compute_content_hash, ResolutionError};
use wp_directory::{SessionKind, SessionMetadata, Sharer};

use crate::api::error::resolution_error;
use crate::state::AppState;

/// Media a client wants to share.  Field names follow the channel JSON
/// shape; the long names are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishBody {
    /// Member to add; defaults to `sharer.id`.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Content hash.  Derived from `path` when omitted.
    #[serde(default, rename = "hash", alias = "content_hash")]
    pub content_hash: Option<String>,
    #[serde(rename = "name", alias = "display_name")]
    pub display_name: String,
    #[serde(rename = "video_type", alias = "kind")]
    pub kind: SessionKind,
    pub sharer: Sharer,
    #[serde(default, rename = "path", alias = "source_path")]
    pub source_path: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl PublishBody {
    fn into_metadata(self) -> Result<SessionMetadata, ResolutionError> {
        let content_hash = match (self.content_hash, self.source_path.as_deref()) {
            (Some(h), _) if !h.trim().is_empty() => h,
            (_, Some(path)) if !path.trim().is_empty() => compute_content_hash(path),
            _ => {
                return Err(ResolutionError::InvalidMetadata(
                    "either hash or path is required".into(),
                ))
            }
        };
        Ok(SessionMetadata {
            content_hash,
            display_name: self.display_name,
            kind: self.kind,
            sharer: self.sharer,
            source_path: self.source_path,
            image: self.image,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/channels/publish
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn publish(State(state): State<AppState>, Json(body): Json<PublishBody>) -> Response {
    let user_id = body.user_id.clone().unwrap_or_default();
    let meta = match body.into_metadata() {
        Ok(m) => m,
        Err(e) => return resolution_error(&e),
    };
    match state.resolver.resolve_as(&user_id, meta).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => resolution_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/channels/join
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Join a known channel (`id`) or publish-and-join (`data`).
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub user_id: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<PublishBody>,
}

pub async fn join(State(state): State<AppState>, Json(body): Json<JoinBody>) -> Response {
    let data = match body.data.map(PublishBody::into_metadata).transpose() {
        Ok(d) => d,
        Err(e) => return resolution_error(&e),
    };
    match state
        .resolver
        .join_or_publish(&body.user_id, body.id.as_deref(), data)
        .await
    {
        Ok(res) => Json(res).into_response(),
        Err(e) => resolution_error(&e),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/channels/online
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn online(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.listing.listing().await)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /v1/channels/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_channel(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.resolver.lookup(&id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => resolution_error(&e),
    }
}
