use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound on create attempts for one publish (base id plus
    /// numeric suffixes).  Tunable; a warning is logged at 80%.
    #[serde(default = "d_max_suffix_attempts")]
    pub max_suffix_attempts: u32,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_suffix_attempts: d_max_suffix_attempts(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounded exponential back-off applied to transient directory failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "d_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "d_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: d_base_delay_ms(),
            max_delay_ms: d_max_delay_ms(),
            max_retries: d_max_retries(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_suffix_attempts() -> u32 {
    1_000
}
fn d_base_delay_ms() -> u64 {
    200
}
fn d_max_delay_ms() -> u64 {
    3_200
}
fn d_max_retries() -> u32 {
    5
}
