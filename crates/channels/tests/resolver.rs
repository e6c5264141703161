//! Resolver behaviour against the in-process directory: convergence of
//! concurrent publishers, suffixing on id collisions, idempotent joins and
//! the transient-failure retry budget.

use std::sync::Arc;

use futures_util::future::join_all;
use wp_channels::{NoSleep, ResolutionError, Resolver, RetryPolicy};
use wp_directory::{
    DirectoryOp, MemoryDirectory, Session, SessionKind, SessionMetadata, Sharer,
};
use wp_domain::config::ResolverConfig;
use wp_domain::error::DirectoryError;

// ── helpers ─────────────────────────────────────────────────────────────

fn metadata(hash: &str, sharer: &str) -> SessionMetadata {
    SessionMetadata {
        content_hash: hash.into(),
        display_name: "Movie Night".into(),
        kind: SessionKind::Online,
        sharer: Sharer {
            id: sharer.into(),
            name: sharer.to_uppercase(),
            color_hue: None,
        },
        source_path: Some("/media/movie-night.mkv".into()),
        image: None,
    }
}

fn resolver_with(dir: &Arc<MemoryDirectory>, max_suffix_attempts: u32) -> Resolver {
    let cfg = ResolverConfig {
        max_suffix_attempts,
        ..Default::default()
    };
    Resolver::new(dir.clone(), &cfg).with_sleeper(Arc::new(NoSleep))
}

fn resolver(dir: &Arc<MemoryDirectory>) -> Resolver {
    resolver_with(dir, ResolverConfig::default().max_suffix_attempts)
}

fn unrelated(id: &str, hash: &str) -> Session {
    Session::from_metadata(id, metadata(hash, "mallory"), chrono::Utc::now(), 1)
}

// ── publish ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_publish_creates_channel_under_content_hash() {
    let dir = Arc::new(MemoryDirectory::new());
    let res = resolver(&dir).resolve(metadata("abc123", "alice")).await.unwrap();

    assert_eq!(res.id, "abc123");
    assert_eq!(res.data.display_name, "Movie Night");
    assert_eq!(res.data.member_count, 1);
    assert_eq!(dir.members("abc123"), vec!["alice".to_string()]);
}

#[tokio::test]
async fn second_publish_of_same_content_converges() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);

    let first = r.resolve(metadata("abc123", "alice")).await.unwrap();
    let mut late = metadata("abc123", "bob");
    late.display_name = "Bob's copy".into();
    let second = r.resolve(late).await.unwrap();

    assert_eq!(second.id, "abc123");
    // The canonical copy wins over the late publisher's metadata.
    assert_eq!(second.data.display_name, first.data.display_name);
    assert_eq!(second.data.sharer.id, "alice");
    assert_eq!(dir.members("abc123"), vec!["alice".to_string(), "bob".to_string()]);
    assert_eq!(dir.len(), 1);
}

#[tokio::test]
async fn concurrent_publishers_of_same_content_converge() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);

    let users = ["alice", "bob", "carol", "dave", "erin"];
    let results = join_all(
        users
            .iter()
            .map(|u| r.resolve(metadata("abc123", u))),
    )
    .await;

    for res in &results {
        assert_eq!(res.as_ref().unwrap().id, "abc123");
    }
    assert_eq!(dir.len(), 1);
    assert_eq!(dir.members("abc123").len(), users.len());
}

#[tokio::test]
async fn id_collision_with_different_content_takes_next_suffix() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);

    let first = r.resolve(metadata("abc123", "alice")).await.unwrap();
    // Sanitizes to the same base id but is different content.
    let second = r.resolve(metadata("abc/123", "bob")).await.unwrap();

    assert_eq!(first.id, "abc123");
    assert_eq!(second.id, "abc123-1");
    assert_eq!(second.data.content_hash, "abc/123");

    // Publishing the second content again converges on its suffixed id.
    let again = r.resolve(metadata("abc/123", "carol")).await.unwrap();
    assert_eq!(again.id, "abc123-1");
}

#[tokio::test]
async fn differing_content_never_shares_an_id() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);

    let hashes = ["abc123", "abc/123", "abc 123", "a:b:c:1:2:3"];
    let results = join_all(hashes.iter().map(|h| r.resolve(metadata(h, "alice")))).await;

    let mut ids: Vec<String> = results.into_iter().map(|r| r.unwrap().id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), hashes.len());
}

#[tokio::test]
async fn suffix_search_is_capped() {
    let dir = Arc::new(MemoryDirectory::new());
    dir.insert(unrelated("abc123", "other-0"));
    dir.insert(unrelated("abc123-1", "other-1"));
    dir.insert(unrelated("abc123-2", "other-2"));

    let err = resolver_with(&dir, 3)
        .resolve(metadata("abc123", "alice"))
        .await
        .unwrap_err();

    match err {
        ResolutionError::ExhaustedSuffixes { base_id, attempts } => {
            assert_eq!(base_id, "abc123");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ExhaustedSuffixes, got {other:?}"),
    }
    assert!(!dir.contains("abc123-3"));
}

#[tokio::test]
async fn vanished_conflict_retries_the_same_candidate() {
    let dir = Arc::new(MemoryDirectory::new());
    dir.insert(unrelated("abc123", "abc123"));
    dir.vanish_after_conflict("abc123");

    let res = resolver(&dir).resolve(metadata("abc123", "alice")).await.unwrap();
    assert_eq!(res.id, "abc123");
    assert_eq!(res.data.sharer.id, "alice");
    assert_eq!(dir.calls(DirectoryOp::CreateGroup), 2);
}

#[tokio::test]
async fn transient_create_failures_are_retried_without_advancing_suffix() {
    let dir = Arc::new(MemoryDirectory::new());
    dir.inject_failures(
        DirectoryOp::CreateGroup,
        DirectoryError::Transient("rate limited".into()),
        3,
    );

    let res = resolver(&dir).resolve(metadata("abc123", "alice")).await.unwrap();
    assert_eq!(res.id, "abc123");
    assert_eq!(dir.calls(DirectoryOp::CreateGroup), 4);
}

#[tokio::test]
async fn persistent_transient_failure_surfaces_as_unavailable() {
    let dir = Arc::new(MemoryDirectory::new());
    dir.inject_failures(
        DirectoryOp::CreateGroup,
        DirectoryError::Transient("503".into()),
        10,
    );

    let err = resolver(&dir)
        .with_retry(RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        })
        .resolve(metadata("abc123", "alice"))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(
        err,
        ResolutionError::Unavailable {
            operation: "create_group",
            ..
        }
    ));
    assert_eq!(dir.calls(DirectoryOp::CreateGroup), 3);
}

#[tokio::test]
async fn rejected_create_surfaces_as_directory_error() {
    let dir = Arc::new(MemoryDirectory::new());
    dir.inject_failures(
        DirectoryOp::CreateGroup,
        DirectoryError::Rejected {
            code: 10004,
            message: "invalid parameter".into(),
        },
        1,
    );

    let err = resolver(&dir)
        .resolve(metadata("abc123", "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolutionError::Directory(DirectoryError::Rejected { .. })));
    assert!(!err.is_retryable());
}

// ── join ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn join_is_idempotent() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);
    r.resolve(metadata("abc123", "alice")).await.unwrap();

    let first = r.join("abc123", "bob").await.unwrap();
    let second = r.join("abc123", "bob").await.unwrap();

    assert_eq!(first.id, "abc123");
    assert_eq!(second.id, "abc123");
    assert_eq!(dir.members("abc123"), vec!["alice".to_string(), "bob".to_string()]);
}

#[tokio::test]
async fn join_unknown_channel_is_no_such_session() {
    let dir = Arc::new(MemoryDirectory::new());
    let err = resolver(&dir).join("nope", "bob").await.unwrap_err();
    assert!(matches!(err, ResolutionError::NoSuchSession { ref id } if id == "nope"));
}

#[tokio::test]
async fn join_retries_transient_membership_failures() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);
    r.resolve(metadata("abc123", "alice")).await.unwrap();
    dir.inject_failures(
        DirectoryOp::AddMember,
        DirectoryError::Transient("timeout".into()),
        2,
    );

    r.join("abc123", "bob").await.unwrap();
    assert_eq!(dir.members("abc123").len(), 2);
}

#[tokio::test]
async fn join_or_publish_dispatches_on_payload() {
    let dir = Arc::new(MemoryDirectory::new());
    let r = resolver(&dir);

    let published = r
        .join_or_publish("alice", None, Some(metadata("abc123", "alice")))
        .await
        .unwrap();
    let joined = r.join_or_publish("bob", Some("abc123"), None).await.unwrap();

    assert_eq!(published.id, joined.id);
    assert_eq!(dir.members("abc123").len(), 2);
}
