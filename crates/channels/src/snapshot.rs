//! Shared storage for the online-listing snapshot.
//!
//! The snapshot lives in a key-value store so every gateway instance
//! honours the same freshness window.  The store is an optimisation: any
//! failure reading or writing it is logged and treated as a miss.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use wp_directory::Session;
use wp_domain::config::{ListingConfig, SnapshotStoreKind};
use wp_domain::error::{Error, Result};

/// One cached view of the online channels, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub sessions: Vec<Session>,
}

impl Snapshot {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.fetched_at)
    }

    /// Servable without refresh while strictly younger than `window`.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.age(now) < window
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, blob: String, ttl: Duration) -> Result<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-process store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-process store with TTL expiry.
#[derive(Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Store("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((blob, _)) => Ok(Some(blob.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, blob: String, ttl: Duration) -> Result<()> {
        self.check()?;
        self.entries
            .lock()
            .insert(key.to_owned(), (blob, Instant::now() + ttl));
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// REST key-value store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
struct KvResponse {
    result: Option<String>,
}

/// Redis-over-REST store (`GET {url}/get/{key}`,
/// `POST {url}/set/{key}?EX={ttl}`).
#[derive(Debug, Clone)]
pub struct RestKvStore {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl RestKvStore {
    pub fn new(cfg: &ListingConfig) -> Result<Self> {
        let base_url = cfg
            .store_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Config("listing.store_url is required for the rest store".into()))?
            .trim_end_matches('/')
            .to_owned();
        let token = std::env::var(&cfg.store_token_env)
            .ok()
            .filter(|t| !t.is_empty());
        if token.is_none() {
            tracing::warn!(env = %cfg.store_token_env, "snapshot store token not set, sending unauthenticated requests");
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn authorize(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }
}

#[async_trait]
impl SnapshotStore for RestKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = format!("{}/get/{key}", self.base_url);
        let resp = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Store(format!("get {key} returned {}", resp.status())));
        }
        let body: KvResponse = resp.json().await.map_err(|e| Error::Store(e.to_string()))?;
        Ok(body.result)
    }

    async fn set(&self, key: &str, blob: String, ttl: Duration) -> Result<()> {
        let url = format!("{}/set/{key}", self.base_url);
        let resp = self
            .authorize(self.http.post(url))
            .query(&[("EX", ttl.as_secs().max(1))])
            .body(blob)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Store(format!("set {key} returned {}", resp.status())));
        }
        Ok(())
    }
}

/// Build the configured snapshot store.
pub fn create_store(cfg: &ListingConfig) -> Result<Arc<dyn SnapshotStore>> {
    match cfg.store {
        SnapshotStoreKind::Memory => Ok(Arc::new(MemorySnapshotStore::new())),
        SnapshotStoreKind::Rest => Ok(Arc::new(RestKvStore::new(cfg)?)),
    }
}
