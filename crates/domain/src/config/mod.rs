mod directory;
mod listing;
mod observability;
mod reaper;
mod resolver;
mod server;

pub use directory::*;
pub use listing::*;
pub use observability::*;
pub use reaper::*;
pub use resolver::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admin
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Admin bearer token.  Takes precedence over `token_env`.
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable holding the admin bearer token.
    /// If neither is set, admin endpoints are open (dev mode).
    #[serde(default = "d_admin_token_env")]
    pub token_env: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token: None,
            token_env: d_admin_token_env(),
        }
    }
}

fn d_admin_token_env() -> String {
    "WP_ADMIN_TOKEN".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message: message.into(),
            });
        };

        if self.server.port == 0 {
            push(ConfigSeverity::Error, "server.port", "port must be greater than 0");
        }
        if self.server.host.is_empty() {
            push(ConfigSeverity::Error, "server.host", "host must not be empty");
        }
        if self.server.max_concurrent_requests == 0 {
            push(
                ConfigSeverity::Error,
                "server.max_concurrent_requests",
                "must be greater than 0",
            );
        }
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            push(
                ConfigSeverity::Warning,
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            );
        }

        if self.directory.backend == DirectoryBackend::Rest {
            if self.directory.base_url.is_empty() {
                push(ConfigSeverity::Error, "directory.base_url", "base_url must not be empty");
            }
            if self.directory.app_id.is_empty() {
                push(
                    ConfigSeverity::Error,
                    "directory.app_id",
                    "app_id is required for the rest backend",
                );
            }
        } else {
            push(
                ConfigSeverity::Warning,
                "directory.backend",
                "memory backend: channels are lost on restart and not shared between instances",
            );
        }

        if self.resolver.max_suffix_attempts == 0 {
            push(
                ConfigSeverity::Error,
                "resolver.max_suffix_attempts",
                "must allow at least one create attempt",
            );
        }
        if self.resolver.retry.base_delay_ms > self.resolver.retry.max_delay_ms {
            push(
                ConfigSeverity::Warning,
                "resolver.retry.base_delay_ms",
                "base delay exceeds max delay; every retry will wait max_delay_ms",
            );
        }

        if self.listing.freshness_ms == 0 {
            push(
                ConfigSeverity::Warning,
                "listing.freshness_ms",
                "0 disables caching; every listing request hits the directory",
            );
        }
        if self.listing.store == SnapshotStoreKind::Rest
            && self.listing.store_url.as_deref().map_or(true, str::is_empty)
        {
            push(
                ConfigSeverity::Error,
                "listing.store_url",
                "store_url is required when listing.store = \"rest\"",
            );
        }
        if self.listing.snapshot_ttl_secs.saturating_mul(1_000) < self.listing.freshness_ms {
            push(
                ConfigSeverity::Warning,
                "listing.snapshot_ttl_secs",
                "store TTL is shorter than the freshness window; stale fallback will be unavailable",
            );
        }

        for (field, sched) in [
            ("reaper.inactive", &self.reaper.inactive),
            ("reaper.abandoned_new", &self.reaper.abandoned_new),
        ] {
            if self.reaper.enabled && sched.interval_secs == 0 {
                push(ConfigSeverity::Error, field, "interval_secs must be greater than 0");
            }
            if sched.horizon_secs == 0 {
                push(
                    ConfigSeverity::Warning,
                    field,
                    "horizon_secs = 0 makes every empty channel eligible immediately",
                );
            }
        }

        errors
    }
}
