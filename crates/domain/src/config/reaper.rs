use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reaper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls the periodic deletion of empty, stale channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Run the sweeps on a timer inside `serve`.  The cron endpoint works
    /// either way.
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Channels with no activity for `horizon_secs`.
    #[serde(default = "d_inactive")]
    pub inactive: SweepSchedule,
    /// Channels created `horizon_secs` ago that nobody joined.
    #[serde(default = "d_abandoned_new")]
    pub abandoned_new: SweepSchedule,
    /// Environment variable holding the bearer secret for `/v1/crons/*`.
    /// If unset, the cron endpoints are open (dev mode).
    #[serde(default = "d_cron_secret_env")]
    pub cron_secret_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSchedule {
    pub horizon_secs: u64,
    pub interval_secs: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inactive: d_inactive(),
            abandoned_new: d_abandoned_new(),
            cron_secret_env: d_cron_secret_env(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_true() -> bool {
    true
}
fn d_inactive() -> SweepSchedule {
    SweepSchedule {
        horizon_secs: 3_600,
        interval_secs: 600,
    }
}
fn d_abandoned_new() -> SweepSchedule {
    SweepSchedule {
        horizon_secs: 300,
        interval_secs: 60,
    }
}
fn d_cron_secret_env() -> String {
    "WP_CRON_SECRET".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_horizons() {
        let cfg = ReaperConfig::default();
        assert!(cfg.enabled);
        assert_eq!(cfg.inactive.horizon_secs, 3_600);
        assert_eq!(cfg.abandoned_new.horizon_secs, 300);
        assert!(cfg.inactive.horizon_secs > cfg.abandoned_new.horizon_secs);
    }

    #[test]
    fn partial_override_keeps_other_schedule() {
        let toml_str = r#"
            enabled = false

            [inactive]
            horizon_secs = 7200
            interval_secs = 900
        "#;
        let cfg: ReaperConfig = toml::from_str(toml_str).unwrap();
        assert!(!cfg.enabled);
        assert_eq!(cfg.inactive.horizon_secs, 7_200);
        assert_eq!(cfg.abandoned_new.interval_secs, 60);
    }
}
