//! Cached view of the online channels.
//!
//! Pollers hit this far more often than channels change.  A snapshot is
//! served verbatim while younger than the freshness window; once it
//! expires, exactly one caller refreshes it from the directory and any
//! callers that arrive meanwhile wait for that refresh and share its
//! result.  A failed refresh never fails the read: the last known
//! snapshot is served and flagged stale, and the directory is left alone
//! for one freshness window before the next attempt.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use wp_directory::{DirectoryProvider, GroupFilter, Session, SessionKind};
use wp_domain::config::ListingConfig;
use wp_domain::error::DirectoryResult;
use wp_domain::trace::TraceEvent;

use crate::backoff::{retry_transient, RetryPolicy, Sleeper, TokioSleeper};
use crate::clock::{Clock, SystemClock};
use crate::snapshot::{MemorySnapshotStore, Snapshot, SnapshotStore};

/// What a listing request receives.
#[derive(Debug, Clone, Serialize)]
pub struct OnlineListing {
    pub channels: Vec<Session>,
    /// `true` when the last refresh failed and `channels` is the previous
    /// snapshot.
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

pub struct ListingCache {
    directory: Arc<dyn DirectoryProvider>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    retry: RetryPolicy,
    key: String,
    freshness: chrono::Duration,
    store_ttl: Duration,
    /// Held for the duration of a refresh.
    refresh: Mutex<()>,
    /// Bumped after every refresh attempt, successful or not.
    generation: AtomicU64,
    last_known: RwLock<Option<Snapshot>>,
    stale: AtomicBool,
    /// No refresh is attempted before this instant after a failure.
    retry_after: RwLock<Option<DateTime<Utc>>>,
}

impl ListingCache {
    pub fn new(directory: Arc<dyn DirectoryProvider>, cfg: &ListingConfig) -> Self {
        Self {
            directory,
            store: Arc::new(MemorySnapshotStore::new()),
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            // Readers wait on the refresh; a failure is absorbed by the
            // cool-down instead of a backoff loop.
            retry: RetryPolicy::none(),
            key: cfg.key.clone(),
            freshness: chrono::Duration::try_milliseconds(
                i64::try_from(cfg.freshness_ms).unwrap_or(i64::MAX),
            )
            .unwrap_or(chrono::Duration::MAX),
            store_ttl: Duration::from_secs(cfg.snapshot_ttl_secs),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
            last_known: RwLock::new(None),
            stale: AtomicBool::new(false),
            retry_after: RwLock::new(None),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
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

    /// Whether the last refresh attempt failed.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    /// Online channels, newest first.
    pub async fn get_online_sessions(&self) -> Vec<Session> {
        self.listing().await.channels
    }

    pub async fn listing(&self) -> OnlineListing {
        let current = self.read_snapshot().await;
        let now = self.clock.now();
        if current.as_ref().is_some_and(|s| s.is_fresh(now, self.freshness)) {
            return self.serve(current, false);
        }
        if self.cooling_down(now) {
            return self.serve(current, true);
        }

        let seen = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh.lock().await;

        if self.generation.load(Ordering::Acquire) != seen {
            // A refresh finished while we queued; share its outcome.
            let current = self.last_known.read().clone();
            return self.serve(current, self.is_stale());
        }

        // Another instance may have refreshed the shared store meanwhile.
        if let Some(snap) = self.read_snapshot().await {
            if snap.is_fresh(self.clock.now(), self.freshness) {
                return self.serve(Some(snap), false);
            }
        }

        let outcome = self.refresh_from_directory().await;
        let served = match outcome {
            Ok(snap) => {
                self.write_snapshot(&snap).await;
                *self.last_known.write() = Some(snap.clone());
                *self.retry_after.write() = None;
                self.stale.store(false, Ordering::Release);
                Some(snap)
            }
            Err(e) => {
                self.stale.store(true, Ordering::Release);
                let until = self
                    .clock
                    .now()
                    .checked_add_signed(self.freshness)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                *self.retry_after.write() = Some(until);
                let previous = self.last_known.read().clone();
                let age_ms = previous
                    .as_ref()
                    .map(|s| s.age(self.clock.now()).num_milliseconds())
                    .unwrap_or(-1);
                tracing::warn!(error = %e, age_ms, "listing refresh failed, serving last known snapshot");
                TraceEvent::ListingServedStale {
                    age_ms,
                    reason: e.to_string(),
                }
                .emit();
                previous
            }
        };
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.serve(served, self.is_stale())
    }

    fn cooling_down(&self, now: DateTime<Utc>) -> bool {
        matches!(*self.retry_after.read(), Some(until) if now < until)
    }

    fn serve(&self, snapshot: Option<Snapshot>, stale: bool) -> OnlineListing {
        match snapshot {
            Some(s) => OnlineListing {
                channels: s.sessions,
                stale,
                fetched_at: Some(s.fetched_at),
            },
            None => OnlineListing {
                channels: Vec::new(),
                stale,
                fetched_at: None,
            },
        }
    }

    /// Newest of the shared snapshot and this process's last known copy.
    async fn read_snapshot(&self) -> Option<Snapshot> {
        let shared = match self.store.get(&self.key).await {
            Ok(Some(blob)) => match serde_json::from_str::<Snapshot>(&blob) {
                Ok(snap) => Some(snap),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "unreadable listing snapshot in store");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "snapshot store read failed");
                None
            }
        };

        let mut local = self.last_known.write();
        if let Some(s) = shared {
            let local_is_newer = local
                .as_ref()
                .map_or(false, |l| l.fetched_at >= s.fetched_at);
            if !local_is_newer {
                *local = Some(s);
            }
        }
        local.clone()
    }

    async fn write_snapshot(&self, snap: &Snapshot) {
        let blob = match serde_json::to_string(snap) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize listing snapshot");
                return;
            }
        };
        if let Err(e) = self.store.set(&self.key, blob, self.store_ttl).await {
            tracing::warn!(key = %self.key, error = %e, "snapshot store write failed");
        }
    }

    async fn refresh_from_directory(&self) -> DirectoryResult<Snapshot> {
        let start = Instant::now();
        let ids = retry_transient(&self.retry, self.sleeper.as_ref(), "list_groups", || {
            self.directory.list_groups(&GroupFilter::All)
        })
        .await?;
        let groups = retry_transient(&self.retry, self.sleeper.as_ref(), "get_groups", || {
            self.directory.get_groups(&ids)
        })
        .await?;

        let scanned = groups.len();
        let mut sessions: Vec<Session> = groups
            .into_iter()
            .filter(|s| s.kind == SessionKind::Online)
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        TraceEvent::ListingRefreshed {
            groups_scanned: scanned,
            online: sessions.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(Snapshot {
            fetched_at: self.clock.now(),
            sessions,
        })
    }
}
