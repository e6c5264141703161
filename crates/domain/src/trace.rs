use serde::Serialize;

/// Structured trace events emitted across all watchparty crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    DirectoryCall {
        operation: String,
        status: u16,
        error_code: i64,
        duration_ms: u64,
    },
    ChannelResolved {
        channel_id: String,
        content_hash: String,
        outcome: String,
        attempts: u32,
    },
    SuffixCollision {
        candidate_id: String,
        requested_hash: String,
        existing_hash: String,
    },
    ChannelJoined {
        channel_id: String,
        user_id: String,
    },
    ListingRefreshed {
        groups_scanned: usize,
        online: usize,
        duration_ms: u64,
    },
    ListingServedStale {
        age_ms: i64,
        reason: String,
    },
    SweepCompleted {
        predicate: String,
        candidates: usize,
        swept: usize,
        failed: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "wp_event");
    }
}
