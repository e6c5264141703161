//! `wp-domain`: types shared by every watchparty crate: configuration,
//! error enums, and structured trace events.

pub mod config;
pub mod error;
pub mod trace;
