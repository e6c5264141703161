use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Online listing cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Maximum snapshot age (ms) that may be served without a refresh.
    #[serde(default = "d_freshness_ms")]
    pub freshness_ms: u64,
    #[serde(default)]
    pub store: SnapshotStoreKind,
    /// Base URL of the Redis-over-REST store (required for `store = "rest"`).
    #[serde(default)]
    pub store_url: Option<String>,
    /// Environment variable holding the store's bearer token.
    #[serde(default = "d_store_token_env")]
    pub store_token_env: String,
    #[serde(default = "d_key")]
    pub key: String,
    /// TTL handed to the store.  Longer than the freshness window so a
    /// stale snapshot stays available as a fallback.
    #[serde(default = "d_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStoreKind {
    /// Per-process store.
    #[default]
    Memory,
    /// Shared networked key-value store.
    Rest,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            freshness_ms: d_freshness_ms(),
            store: SnapshotStoreKind::Memory,
            store_url: None,
            store_token_env: d_store_token_env(),
            key: d_key(),
            snapshot_ttl_secs: d_snapshot_ttl_secs(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_freshness_ms() -> u64 {
    3_000
}
fn d_store_token_env() -> String {
    "WP_KV_TOKEN".into()
}
fn d_key() -> String {
    "online_channel_cache".into()
}
fn d_snapshot_ttl_secs() -> u64 {
    60
}
