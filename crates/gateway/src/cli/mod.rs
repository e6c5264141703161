pub mod config;
pub mod sweep;

use clap::{Parser, Subcommand, ValueEnum};

/// Watch-party channel gateway.
#[derive(Debug, Parser)]
#[command(name = "watchparty", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Run one reaper sweep against the configured directory and print
    /// the report as JSON.
    Sweep {
        /// Which staleness predicate to apply.
        #[arg(long, value_enum, default_value = "all")]
        predicate: SweepPredicate,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SweepPredicate {
    Inactive,
    AbandonedNew,
    All,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `WP_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
///
/// [`Config`]: wp_domain::config::Config
pub fn load_config() -> anyhow::Result<(wp_domain::config::Config, String)> {
    let config_path = std::env::var("WP_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

/// Parse `path` as TOML, falling back to defaults when the file is absent.
pub fn load_config_from(path: &str) -> anyhow::Result<wp_domain::config::Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(wp_domain::config::Config::default());
    }
    let raw =
        std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
