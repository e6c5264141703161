//! Channel resolution for watch parties.
//!
//! Turns a weakly consistent group directory into a deduplicated channel
//! registry: content-addressed ids, create-or-join resolution that
//! converges under concurrent publishes, a shared short-lived listing
//! cache, and a reaper for empty stale channels.

pub mod backoff;
pub mod clock;
pub mod identity;
pub mod listing;
pub mod reaper;
pub mod resolver;
pub mod snapshot;

pub use backoff::{retry_transient, NoSleep, RetryPolicy, Sleeper, TokioSleeper};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{
    compute_content_hash, derive_base_id, derive_candidate_id, directory_group_name,
    IdentityError,
};
pub use listing::{ListingCache, OnlineListing};
pub use reaper::{Reaper, StalenessPredicate, SweepError, SweepReport};
pub use resolver::{Resolution, ResolutionError, ResolutionResult, Resolver};
pub use snapshot::{create_store, MemorySnapshotStore, RestKvStore, Snapshot, SnapshotStore};
