use std::sync::Arc;

use wp_channels::{ListingCache, Reaper, Resolver};
use wp_directory::DirectoryProvider;
use wp_domain::config::Config;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config, directory
/// - **Channels**: resolver, listing cache, reaper
/// - **Security**: token hashes computed once at startup
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub directory: Arc<dyn DirectoryProvider>,

    // ── Channels ──────────────────────────────────────────────────────
    pub resolver: Arc<Resolver>,
    pub listing: Arc<ListingCache>,
    pub reaper: Arc<Reaper>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
    /// SHA-256 hash of the admin bearer token.
    /// `None` = dev mode (admin endpoints accessible without auth).
    pub admin_token_hash: Option<Vec<u8>>,
    /// SHA-256 hash of the cron secret guarding `/v1/crons/*`.
    /// `None` = dev mode.
    pub cron_secret_hash: Option<Vec<u8>>,
}
