//! Create-or-join resolution of watch-party channels.
//!
//! The directory has no "create or join" primitive, only an atomic
//! create-by-id that fails when the id is taken.  Publishing therefore
//! proceeds as a small state machine:
//!
//! ```text
//! Start → Deriving → Attempting(n) ─┬─ created ─────────────→ Converged
//!                                   ├─ exists, same hash ───→ Converged (join)
//!                                   ├─ exists, other hash ──→ Attempting(n+1)
//!                                   ├─ exists, vanished ────→ Attempting(n)
//!                                   └─ terminal error ──────→ Failed
//! ```
//!
//! Two publishers of the same content race on the same candidate id; the
//! directory lets exactly one create win and the other observes
//! `AlreadyExists` with a matching hash, so both converge on one channel.

use std::sync::Arc;

use serde::Serialize;
use wp_directory::{CreateGroup, DirectoryProvider, Session, SessionMetadata};
use wp_domain::config::ResolverConfig;
use wp_domain::error::DirectoryError;
use wp_domain::trace::TraceEvent;

use crate::backoff::{retry_transient, RetryPolicy, Sleeper, TokioSleeper};
use crate::clock::{Clock, SystemClock};
use crate::identity::{derive_base_id, derive_candidate_id, directory_group_name};

/// The canonical channel a publish or join resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub id: String,
    pub data: Session,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolutionError {
    #[error("no such channel: {id}")]
    NoSuchSession { id: String },

    /// Every candidate id up to the cap belonged to unrelated content.
    #[error("no free channel id for {base_id} after {attempts} attempts")]
    ExhaustedSuffixes { base_id: String, attempts: u32 },

    /// The directory kept failing transiently; the caller may retry later.
    #[error("directory unavailable during {operation}: {source}")]
    Unavailable {
        operation: &'static str,
        source: DirectoryError,
    },

    #[error("directory error: {0}")]
    Directory(DirectoryError),

    #[error("invalid request: {0}")]
    InvalidMetadata(String),
}

impl ResolutionError {
    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoSuchSession { .. } => "no_such_session",
            Self::ExhaustedSuffixes { .. } => "exhausted_suffixes",
            Self::Unavailable { .. } => "unavailable",
            Self::Directory(_) => "directory",
            Self::InvalidMetadata(_) => "invalid_metadata",
        }
    }

    fn from_directory(operation: &'static str, e: DirectoryError) -> Self {
        if e.is_transient() {
            Self::Unavailable {
                operation,
                source: e,
            }
        } else {
            Self::Directory(e)
        }
    }
}

pub type ResolutionResult<T> = std::result::Result<T, ResolutionError>;

/// Resolves publish and join requests against the directory.
pub struct Resolver {
    directory: Arc<dyn DirectoryProvider>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    max_suffix_attempts: u32,
}

impl Resolver {
    pub fn new(directory: Arc<dyn DirectoryProvider>, cfg: &ResolverConfig) -> Self {
        Self {
            directory,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
            retry: RetryPolicy::from_config(&cfg.retry),
            max_suffix_attempts: cfg.max_suffix_attempts.max(1),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_suffix_attempts(&self) -> u32 {
        self.max_suffix_attempts
    }

    /// Publish `metadata`, joining as its sharer.
    pub async fn resolve(&self, metadata: SessionMetadata) -> ResolutionResult<Resolution> {
        let member = metadata.sharer.id.clone();
        self.resolve_as(&member, metadata).await
    }

    /// Publish `metadata` and make `user_id` a member of the resulting
    /// channel, which is either newly created or the existing channel for
    /// the same content.
    pub async fn resolve_as(
        &self,
        user_id: &str,
        metadata: SessionMetadata,
    ) -> ResolutionResult<Resolution> {
        validate_metadata(&metadata)?;
        let member = if user_id.trim().is_empty() {
            metadata.sharer.id.clone()
        } else {
            user_id.to_owned()
        };
        if member.trim().is_empty() {
            return Err(ResolutionError::InvalidMetadata(
                "a publishing user id is required".into(),
            ));
        }

        let base_id = derive_base_id(&metadata.content_hash)
            .map_err(|e| ResolutionError::InvalidMetadata(e.to_string()))?;
        let name = directory_group_name(&metadata.display_name);
        let warn_at = (self.max_suffix_attempts / 5 * 4).max(1);

        let mut suffix = 0u32;
        let mut attempts = 0u32;
        while attempts < self.max_suffix_attempts {
            attempts += 1;
            if attempts == warn_at && warn_at < self.max_suffix_attempts {
                tracing::warn!(
                    base_id = %base_id,
                    attempts,
                    cap = self.max_suffix_attempts,
                    "channel id suffix search approaching its cap"
                );
            }

            let candidate = derive_candidate_id(&base_id, suffix);
            let req = CreateGroup {
                id: candidate.clone(),
                name: name.clone(),
                initial_member: member.clone(),
                metadata: metadata.clone(),
            };

            match self
                .retrying("create_group", || self.directory.create_group(&req))
                .await
            {
                Ok(()) => {
                    let data = Session::from_metadata(
                        candidate.clone(),
                        metadata,
                        self.clock.now(),
                        1,
                    );
                    emit_resolved(&data, "created", attempts);
                    return Ok(Resolution {
                        id: candidate,
                        data,
                    });
                }
                Err(DirectoryError::AlreadyExists { .. }) => {}
                Err(e) => return Err(ResolutionError::from_directory("create_group", e)),
            }

            let existing = match self
                .retrying("get_group", || self.directory.get_group(&candidate))
                .await
            {
                Ok(existing) => existing,
                Err(DirectoryError::NotFound { .. }) => {
                    tracing::debug!(candidate_id = %candidate, "conflicting channel vanished, retrying id");
                    continue;
                }
                Err(e) => return Err(ResolutionError::from_directory("get_group", e)),
            };

            if existing.content_hash != metadata.content_hash {
                TraceEvent::SuffixCollision {
                    candidate_id: candidate.clone(),
                    requested_hash: metadata.content_hash.clone(),
                    existing_hash: existing.content_hash.clone(),
                }
                .emit();
                suffix += 1;
                continue;
            }

            match self
                .retrying("add_member", || self.directory.add_member(&candidate, &member))
                .await
            {
                Ok(()) => {
                    emit_resolved(&existing, "converged", attempts);
                    return Ok(Resolution {
                        id: candidate,
                        data: existing,
                    });
                }
                Err(DirectoryError::NotFound { .. }) => {
                    tracing::debug!(candidate_id = %candidate, "canonical channel vanished before join, retrying id");
                }
                Err(e) => return Err(ResolutionError::from_directory("add_member", e)),
            }
        }

        tracing::error!(
            base_id = %base_id,
            attempts,
            content_hash = %metadata.content_hash,
            "exhausted channel id suffixes"
        );
        Err(ResolutionError::ExhaustedSuffixes { base_id, attempts })
    }

    /// Join a known channel.  Joining twice is a no-op.
    pub async fn join(&self, id: &str, user_id: &str) -> ResolutionResult<Resolution> {
        if id.trim().is_empty() {
            return Err(ResolutionError::InvalidMetadata("channel id is required".into()));
        }
        if user_id.trim().is_empty() {
            return Err(ResolutionError::InvalidMetadata("user id is required".into()));
        }

        let data = self.lookup(id).await?;
        match self
            .retrying("add_member", || self.directory.add_member(id, user_id))
            .await
        {
            Ok(()) => {}
            Err(DirectoryError::NotFound { .. }) => {
                return Err(ResolutionError::NoSuchSession { id: id.to_owned() })
            }
            Err(e) => return Err(ResolutionError::from_directory("add_member", e)),
        }

        TraceEvent::ChannelJoined {
            channel_id: id.to_owned(),
            user_id: user_id.to_owned(),
        }
        .emit();
        Ok(Resolution {
            id: id.to_owned(),
            data,
        })
    }

    /// Single entry point for clients that send either a channel to join
    /// or media to publish.  `data` wins when both are present.
    pub async fn join_or_publish(
        &self,
        user_id: &str,
        id: Option<&str>,
        data: Option<SessionMetadata>,
    ) -> ResolutionResult<Resolution> {
        match (data, id) {
            (Some(meta), _) => self.resolve_as(user_id, meta).await,
            (None, Some(id)) => self.join(id, user_id).await,
            (None, None) => Err(ResolutionError::InvalidMetadata(
                "either a channel id or publish data is required".into(),
            )),
        }
    }

    /// Current directory view of one channel.
    pub async fn lookup(&self, id: &str) -> ResolutionResult<Session> {
        match self
            .retrying("get_group", || self.directory.get_group(id))
            .await
        {
            Ok(s) => Ok(s),
            Err(DirectoryError::NotFound { .. }) => {
                Err(ResolutionError::NoSuchSession { id: id.to_owned() })
            }
            Err(e) => Err(ResolutionError::from_directory("get_group", e)),
        }
    }

    async fn retrying<T, F, Fut>(&self, operation: &str, f: F) -> wp_domain::error::DirectoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = wp_domain::error::DirectoryResult<T>>,
    {
        retry_transient(&self.retry, self.sleeper.as_ref(), operation, f).await
    }
}

fn validate_metadata(meta: &SessionMetadata) -> ResolutionResult<()> {
    if meta.content_hash.trim().is_empty() {
        return Err(ResolutionError::InvalidMetadata("content hash is required".into()));
    }
    if meta.display_name.trim().is_empty() {
        return Err(ResolutionError::InvalidMetadata("display name is required".into()));
    }
    Ok(())
}

fn emit_resolved(session: &Session, outcome: &str, attempts: u32) {
    TraceEvent::ChannelResolved {
        channel_id: session.id.clone(),
        content_hash: session.content_hash.clone(),
        outcome: outcome.to_owned(),
        attempts,
    }
    .emit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::NoSleep;
    use wp_directory::{MemoryDirectory, SessionKind, Sharer};

    fn meta(hash: &str) -> SessionMetadata {
        SessionMetadata {
            content_hash: hash.into(),
            display_name: "Movie Night".into(),
            kind: SessionKind::Online,
            sharer: Sharer {
                id: "alice".into(),
                name: "Alice".into(),
                color_hue: Some(210),
            },
            source_path: None,
            image: None,
        }
    }

    fn resolver(dir: Arc<MemoryDirectory>) -> Resolver {
        Resolver::new(dir, &ResolverConfig::default()).with_sleeper(Arc::new(NoSleep))
    }

    #[tokio::test]
    async fn rejects_blank_hash() {
        let r = resolver(Arc::new(MemoryDirectory::new()));
        let err = r.resolve(meta("  ")).await.unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidMetadata(_)));
    }

    #[tokio::test]
    async fn rejects_hash_with_no_usable_characters() {
        let r = resolver(Arc::new(MemoryDirectory::new()));
        let err = r.resolve(meta("???")).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_metadata");
    }

    #[tokio::test]
    async fn join_or_publish_requires_something() {
        let r = resolver(Arc::new(MemoryDirectory::new()));
        let err = r.join_or_publish("bob", None, None).await.unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidMetadata(_)));
    }

    #[tokio::test]
    async fn publish_uses_explicit_user_as_member() {
        let dir = Arc::new(MemoryDirectory::new());
        let r = resolver(dir.clone());
        r.resolve_as("carol", meta("abc123")).await.unwrap();
        assert_eq!(dir.members("abc123"), vec!["carol".to_string()]);
    }

    #[test]
    fn only_unavailable_is_retryable() {
        let unavailable = ResolutionError::from_directory(
            "create_group",
            DirectoryError::Transient("503".into()),
        );
        assert!(unavailable.is_retryable());
        let terminal = ResolutionError::from_directory(
            "create_group",
            DirectoryError::Rejected {
                code: 10004,
                message: "bad".into(),
            },
        );
        assert!(!terminal.is_retryable());
        assert_eq!(terminal.kind(), "directory");
    }
}
