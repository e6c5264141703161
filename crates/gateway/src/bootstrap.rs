//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! `serve` and the one-shot `sweep` command share [`build_app_state`] so
//! they boot the same directory client and channel services.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use wp_channels::{create_store, ListingCache, Reaper, Resolver, RetryPolicy, StalenessPredicate};
use wp_directory::{create_provider, DirectoryProvider};
use wp_domain::config::{Config, ConfigSeverity};

use crate::state::AppState;

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Group directory ──────────────────────────────────────────────
    let directory =
        create_provider(&config.directory).context("creating group directory client")?;
    tracing::info!(backend = ?config.directory.backend, "group directory ready");

    // ── Listing snapshot store ───────────────────────────────────────
    let store = create_store(&config.listing).context("creating listing snapshot store")?;
    tracing::info!(
        store = ?config.listing.store,
        key = %config.listing.key,
        freshness_ms = config.listing.freshness_ms,
        "listing snapshot store ready"
    );

    let mut state = assemble(config.clone(), directory);
    state.listing =
        Arc::new(ListingCache::new(state.directory.clone(), &config.listing).with_store(store));

    // ── Tokens (read once, hash for constant-time comparison) ────────
    state.api_token_hash = token_hash(
        "API",
        config.server.api_token.as_deref(),
        &config.server.api_token_env,
    );
    state.admin_token_hash = token_hash(
        "admin",
        config.admin.token.as_deref(),
        &config.admin.token_env,
    );
    state.cron_secret_hash = token_hash("cron", None, &config.reaper.cron_secret_env);

    Ok(state)
}

/// Wire channel services over an existing directory, with auth disabled
/// and a per-process snapshot store.
pub fn assemble(config: Arc<Config>, directory: Arc<dyn DirectoryProvider>) -> AppState {
    let retry = RetryPolicy::from_config(&config.resolver.retry);

    let resolver = Arc::new(Resolver::new(directory.clone(), &config.resolver));
    tracing::info!(
        max_suffix_attempts = resolver.max_suffix_attempts(),
        max_retries = retry.max_retries,
        "channel resolver ready"
    );

    // The listing keeps its own single-attempt policy; failures cool down
    // for a freshness window rather than retrying under readers.
    let listing = Arc::new(ListingCache::new(directory.clone(), &config.listing));
    let reaper = Arc::new(Reaper::new(directory.clone()).with_retry(retry));

    AppState {
        config,
        directory,
        resolver,
        listing,
        reaper,
        api_token_hash: None,
        admin_token_hash: None,
        cron_secret_hash: None,
    }
}

/// Resolve a bearer token (inline value first, then env var) and return
/// its SHA-256 digest.  `None` means the endpoint group runs open.
fn token_hash(label: &str, inline: Option<&str>, env_var: &str) -> Option<Vec<u8>> {
    let token = inline
        .filter(|t| !t.is_empty())
        .map(|t| ("config".to_string(), t.to_string()))
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .filter(|t| !t.is_empty())
                .map(|t| (format!("env:{env_var}"), t))
        });
    match token {
        Some((source, t)) => {
            tracing::info!(source = %source, "{label} bearer-token auth enabled");
            Some(Sha256::digest(t.as_bytes()).to_vec())
        }
        None => {
            tracing::warn!("{label} bearer-token auth DISABLED; set {env_var} to enable");
            None
        }
    }
}

/// Spawn the long-running background tokio tasks (the two reaper loops).
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) {
    let reaper_cfg = &state.config.reaper;
    if !reaper_cfg.enabled {
        tracing::info!("reaper disabled (reaper.enabled = false)");
        return;
    }

    for (predicate, interval_secs) in [
        (
            StalenessPredicate::inactive(&reaper_cfg.inactive),
            reaper_cfg.inactive.interval_secs,
        ),
        (
            StalenessPredicate::abandoned_new(&reaper_cfg.abandoned_new),
            reaper_cfg.abandoned_new.interval_secs,
        ),
    ] {
        let reaper = state.reaper.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if let Err(e) = reaper.sweep(predicate).await {
                    tracing::warn!(predicate = predicate.name(), error = %e, "scheduled sweep failed");
                }
            }
        });
        tracing::info!(
            predicate = predicate.name(),
            horizon_secs = predicate.horizon().as_secs(),
            interval_secs,
            "reaper loop spawned"
        );
    }
    tracing::info!("background tasks spawned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use wp_domain::config::DirectoryBackend;

    #[test]
    fn inline_token_is_hashed() {
        let hash = token_hash("API", Some("s3cret"), "WP_TEST_TOKEN_THAT_IS_NEVER_SET");
        assert_eq!(hash, Some(Sha256::digest(b"s3cret").to_vec()));
    }

    #[test]
    fn missing_token_means_dev_mode() {
        assert!(token_hash("API", Some(""), "WP_TEST_TOKEN_THAT_IS_NEVER_SET").is_none());
    }

    #[tokio::test]
    async fn invalid_config_fails_boot() {
        let mut config = Config::default();
        config.directory.backend = DirectoryBackend::Memory;
        config.resolver.max_suffix_attempts = 0;
        assert!(build_app_state(Arc::new(config)).await.is_err());
    }

    #[tokio::test]
    async fn memory_backend_boots() {
        let mut config = Config::default();
        config.directory.backend = DirectoryBackend::Memory;
        let state = build_app_state(Arc::new(config)).await.unwrap();
        assert!(state.listing.get_online_sessions().await.is_empty());
    }
}
