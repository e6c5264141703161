//! Cron trigger for external schedulers: `POST /v1/crons/reap`.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;

use wp_channels::StalenessPredicate;

use crate::api::admin::CronGuard;
use crate::api::error::directory_error;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateChoice {
    Inactive,
    AbandonedNew,
    #[default]
    All,
}

impl PredicateChoice {
    /// Configured predicates selected by this choice.
    pub fn predicates(self, cfg: &wp_domain::config::ReaperConfig) -> Vec<StalenessPredicate> {
        match self {
            Self::Inactive => vec![StalenessPredicate::inactive(&cfg.inactive)],
            Self::AbandonedNew => vec![StalenessPredicate::abandoned_new(&cfg.abandoned_new)],
            Self::All => StalenessPredicate::all(cfg).to_vec(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReapQuery {
    #[serde(default)]
    pub predicate: PredicateChoice,
}

pub async fn reap(
    _guard: CronGuard,
    State(state): State<AppState>,
    Query(q): Query<ReapQuery>,
) -> Response {
    let mut reports = Vec::new();
    for predicate in q.predicate.predicates(&state.config.reaper) {
        match state.reaper.sweep(predicate).await {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(predicate = predicate.name(), error = %e, "cron sweep failed");
                return directory_error(&e.source);
            }
        }
    }
    let swept_count: usize = reports.iter().map(|r| r.swept_count).sum();
    Json(serde_json::json!({
        "swept_count": swept_count,
        "reports": reports,
    }))
    .into_response()
}
