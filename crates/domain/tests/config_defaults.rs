use wp_domain::config::{Config, ConfigSeverity, DirectoryBackend, SnapshotStoreKind};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8640
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn listing_defaults_to_three_second_window() {
    let config = Config::default();
    assert_eq!(config.listing.freshness_ms, 3_000);
    assert_eq!(config.listing.store, SnapshotStoreKind::Memory);
    assert_eq!(config.listing.key, "online_channel_cache");
}

#[test]
fn resolver_defaults() {
    let config = Config::default();
    assert_eq!(config.resolver.max_suffix_attempts, 1_000);
    assert_eq!(config.resolver.retry.base_delay_ms, 200);
    assert_eq!(config.resolver.retry.max_retries, 5);
}

#[test]
fn admin_token_env_default() {
    let config = Config::default();
    assert_eq!(config.admin.token_env, "WP_ADMIN_TOKEN");
}

#[test]
fn default_rest_backend_requires_app_id() {
    let config = Config::default();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "directory.app_id" && i.severity == ConfigSeverity::Error));
}

#[test]
fn memory_backend_validates_with_warning_only() {
    let toml_str = r#"
[directory]
backend = "memory"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.directory.backend, DirectoryBackend::Memory);
    let issues = config.validate();
    assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
    assert!(issues.iter().any(|i| i.field == "directory.backend"));
}

#[test]
fn rest_store_without_url_is_an_error() {
    let toml_str = r#"
[directory]
backend = "memory"

[listing]
store = "rest"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "listing.store_url" && i.severity == ConfigSeverity::Error));
}

#[test]
fn zero_suffix_cap_is_an_error() {
    let toml_str = r#"
[directory]
backend = "memory"

[resolver]
max_suffix_attempts = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "resolver.max_suffix_attempts" && i.severity == ConfigSeverity::Error));
}

#[test]
fn huge_listing_values_validate_without_overflow() {
    let mut config = Config::default();
    config.directory.backend = DirectoryBackend::Memory;
    config.listing.snapshot_ttl_secs = u64::MAX;
    config.listing.freshness_ms = u64::MAX - 1;
    let issues = config.validate();
    assert!(!issues.iter().any(|i| i.field == "listing.snapshot_ttl_secs"));
}
