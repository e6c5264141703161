//! Reaper: deletes channels that are empty and stale.
//!
//! Two predicates run on independent schedules: `Inactive` catches
//! channels nobody has touched for a long while, `AbandonedNew` catches
//! channels that were created and never joined.  In both cases a channel
//! with any member left is never deleted.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use wp_directory::{DirectoryProvider, GroupFilter};
use wp_domain::config::{ReaperConfig, SweepSchedule};
use wp_domain::error::DirectoryError;
use wp_domain::trace::TraceEvent;

use crate::backoff::{retry_transient, RetryPolicy, Sleeper, TokioSleeper};
use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessPredicate {
    /// No activity for at least `horizon`.
    Inactive { horizon: Duration },
    /// Created at least `horizon` ago.
    AbandonedNew { horizon: Duration },
}

impl StalenessPredicate {
    pub fn inactive(schedule: &SweepSchedule) -> Self {
        Self::Inactive {
            horizon: Duration::from_secs(schedule.horizon_secs),
        }
    }

    pub fn abandoned_new(schedule: &SweepSchedule) -> Self {
        Self::AbandonedNew {
            horizon: Duration::from_secs(schedule.horizon_secs),
        }
    }

    /// Both predicates as configured.
    pub fn all(cfg: &ReaperConfig) -> [Self; 2] {
        [Self::inactive(&cfg.inactive), Self::abandoned_new(&cfg.abandoned_new)]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Inactive { .. } => "inactive",
            Self::AbandonedNew { .. } => "abandoned_new",
        }
    }

    pub fn horizon(&self) -> Duration {
        match self {
            Self::Inactive { horizon } | Self::AbandonedNew { horizon } => *horizon,
        }
    }

    /// Directory filter selecting candidates as of `now`.
    pub fn filter(&self, now: chrono::DateTime<chrono::Utc>) -> GroupFilter {
        let secs = i64::try_from(self.horizon().as_secs()).unwrap_or(i64::MAX);
        let cutoff = chrono::Duration::try_seconds(secs)
            .and_then(|horizon| now.checked_sub_signed(horizon))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        match self {
            Self::Inactive { .. } => GroupFilter::InactiveSince(cutoff),
            Self::AbandonedNew { .. } => GroupFilter::CreatedBefore(cutoff),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub predicate: String,
    /// Channels the directory reported as stale.
    pub candidates: usize,
    /// Ids the directory reported as gone after the delete.  Includes any
    /// that a concurrent delete removed first, so it can overstate what
    /// this sweep itself removed.
    pub swept_count: usize,
    /// Ids whose deletion failed.
    pub failed: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
#[error("sweep failed during {operation}: {source}")]
pub struct SweepError {
    pub operation: &'static str,
    pub source: DirectoryError,
}

pub struct Reaper {
    directory: Arc<dyn DirectoryProvider>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
}

impl Reaper {
    pub fn new(directory: Arc<dyn DirectoryProvider>) -> Self {
        Self {
            directory,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Delete every empty channel matching `predicate`.
    pub async fn sweep(&self, predicate: StalenessPredicate) -> Result<SweepReport, SweepError> {
        let filter = predicate.filter(self.clock.now());

        let ids = retry_transient(&self.retry, self.sleeper.as_ref(), "list_groups", || {
            self.directory.list_groups(&filter)
        })
        .await
        .map_err(|source| SweepError {
            operation: "list_groups",
            source,
        })?;

        let mut report = SweepReport {
            predicate: predicate.name().to_owned(),
            candidates: ids.len(),
            swept_count: 0,
            failed: Vec::new(),
        };

        if !ids.is_empty() {
            // Re-read so membership and activity are current, not as of listing.
            let current = retry_transient(&self.retry, self.sleeper.as_ref(), "get_groups", || {
                self.directory.get_groups(&ids)
            })
            .await
            .map_err(|source| SweepError {
                operation: "get_groups",
                source,
            })?;

            let empty: Vec<String> = current
                .into_iter()
                .filter(|s| s.member_count == 0 && filter.matches(s))
                .map(|s| s.id)
                .collect();

            if !empty.is_empty() {
                let outcome =
                    retry_transient(&self.retry, self.sleeper.as_ref(), "delete_groups", || {
                        self.directory.delete_groups(&empty)
                    })
                    .await
                    .map_err(|source| SweepError {
                        operation: "delete_groups",
                        source,
                    })?;
                report.swept_count = outcome.deleted.len();
                report.failed = outcome.failed.into_iter().map(|(id, _)| id).collect();
            }
        }

        TraceEvent::SweepCompleted {
            predicate: report.predicate.clone(),
            candidates: report.candidates,
            swept: report.swept_count,
            failed: report.failed.len(),
        }
        .emit();
        tracing::info!(
            predicate = %report.predicate,
            candidates = report.candidates,
            swept = report.swept_count,
            failed = report.failed.len(),
            "sweep completed"
        );
        Ok(report)
    }
}
