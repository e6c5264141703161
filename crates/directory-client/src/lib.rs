//! `wp-directory`: group directory client for the watchparty gateway.
//!
//! Provides the [`DirectoryProvider`] trait that abstracts over the
//! external group-chat directory, a production REST implementation
//! ([`RestDirectoryClient`]), an in-process implementation
//! ([`MemoryDirectory`]), typed wire DTOs, and the channel data model
//! ([`Session`], [`SessionMetadata`]).
//!
//! # Backend selection
//!
//! Use [`create_provider`] to build the right implementation based on
//! the `directory.backend` config field:
//!
//! | Backend  | Implementation        | Best for                      |
//! |----------|-----------------------|-------------------------------|
//! | `rest`   | `RestDirectoryClient` | Production (default)          |
//! | `memory` | `MemoryDirectory`     | Local development, tests      |
//!
//! # Quick start
//!
//! ```rust,no_run
//! use wp_directory::{DirectoryProvider, GroupFilter, MemoryDirectory};
//!
//! # async fn example() -> wp_domain::error::DirectoryResult<()> {
//! let dir = MemoryDirectory::new();
//! let ids = dir.list_groups(&GroupFilter::All).await?;
//! println!("{} channels", ids.len());
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod model;
pub mod provider;
pub mod rest;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use memory::MemoryDirectory;
pub use model::{
    CreateGroup, DeleteOutcome, GroupFilter, Session, SessionKind, SessionMetadata, Sharer,
};
pub use provider::{DirectoryOp, DirectoryProvider};
pub use rest::{classify_error_code, from_reqwest, RestDirectoryClient};

use std::sync::Arc;

use wp_domain::config::{DirectoryBackend, DirectoryConfig};
use wp_domain::error::Result;

/// Create the appropriate [`DirectoryProvider`] based on the backend
/// config.
pub fn create_provider(cfg: &DirectoryConfig) -> Result<Arc<dyn DirectoryProvider>> {
    match cfg.backend {
        DirectoryBackend::Rest => {
            let client = RestDirectoryClient::new(cfg)?;
            tracing::info!(
                base_url = %cfg.base_url,
                app_id = %cfg.app_id,
                timeout_ms = cfg.timeout_ms,
                "using REST group directory"
            );
            Ok(Arc::new(client))
        }
        DirectoryBackend::Memory => {
            tracing::warn!("using in-memory group directory; channels are not persisted");
            Ok(Arc::new(MemoryDirectory::new()))
        }
    }
}
