use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Group directory connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "d_backend")]
    pub backend: DirectoryBackend,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Application id issued by the directory service (`sdkappid`).
    #[serde(default)]
    pub app_id: String,
    /// Administrator account the gateway acts as (`identifier`).
    #[serde(default = "d_admin_identifier")]
    pub admin_identifier: String,
    /// Pre-issued signature for the administrator account.  Takes
    /// precedence over `user_sig_env`.
    #[serde(default)]
    pub user_sig: Option<String>,
    /// Environment variable holding the administrator signature.
    #[serde(default = "d_user_sig_env")]
    pub user_sig_env: String,
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// The hosted group-chat directory over HTTP.
    Rest,
    /// In-process directory; state is lost on restart.
    Memory,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Rest,
            base_url: d_base_url(),
            app_id: String::new(),
            admin_identifier: d_admin_identifier(),
            user_sig: None,
            user_sig_env: d_user_sig_env(),
            timeout_ms: 8000,
        }
    }
}

impl DirectoryConfig {
    /// Resolve the administrator signature: config value first, then the
    /// configured env var.  Empty strings count as unset.
    pub fn resolve_user_sig(&self) -> Option<String> {
        self.user_sig
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                std::env::var(&self.user_sig_env)
                    .ok()
                    .filter(|s| !s.is_empty())
            })
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_backend() -> DirectoryBackend {
    DirectoryBackend::Rest
}
fn d_base_url() -> String {
    "https://console.tim.qq.com".into()
}
fn d_admin_identifier() -> String {
    "administrator".into()
}
fn d_user_sig_env() -> String {
    "WP_DIRECTORY_USER_SIG".into()
}
fn d_8000() -> u64 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: DirectoryConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.backend, DirectoryBackend::Rest);
        assert_eq!(cfg.timeout_ms, 8000);
        assert_eq!(cfg.user_sig_env, "WP_DIRECTORY_USER_SIG");
    }

    #[test]
    fn memory_backend_parses() {
        let cfg: DirectoryConfig = toml::from_str(r#"backend = "memory""#).unwrap();
        assert_eq!(cfg.backend, DirectoryBackend::Memory);
    }

    #[test]
    fn inline_user_sig_wins() {
        let cfg = DirectoryConfig {
            user_sig: Some("inline".into()),
            user_sig_env: "WP_TEST_SIG_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert_eq!(cfg.resolve_user_sig().as_deref(), Some("inline"));
    }

    #[test]
    fn empty_inline_user_sig_is_unset() {
        let cfg = DirectoryConfig {
            user_sig: Some(String::new()),
            user_sig_env: "WP_TEST_SIG_THAT_IS_NEVER_SET".into(),
            ..Default::default()
        };
        assert!(cfg.resolve_user_sig().is_none());
    }
}
