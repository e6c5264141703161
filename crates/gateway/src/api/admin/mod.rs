//! Admin endpoints: health probe and manual channel removal.
//!
//! Admin-guarded endpoints use the `AdminGuard` extractor (see `guard.rs`),
//! which enforces the admin token.  If no token is configured, endpoints
//! are accessible without auth (dev mode).

mod channels;
mod guard;
mod health;

pub use channels::delete_channel;
pub use guard::{AdminGuard, CronGuard};
pub use health::health;
