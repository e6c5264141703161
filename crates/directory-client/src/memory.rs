//! In-process [`DirectoryProvider`].
//!
//! Used by the `memory` backend for local development and by tests across
//! the workspace.  Beyond the trait it exposes call counters, scripted
//! fault injection and an artificial listing delay so callers can observe
//! retry, coalescing and fallback behaviour deterministically.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use wp_domain::error::{DirectoryError, DirectoryResult};

use crate::model::{CreateGroup, DeleteOutcome, GroupFilter, Session};
use crate::provider::{DirectoryOp, DirectoryProvider};

#[derive(Debug, Clone)]
struct Group {
    session: Session,
    members: BTreeSet<String>,
}

#[derive(Default)]
struct Inner {
    groups: BTreeMap<String, Group>,
    calls: HashMap<DirectoryOp, usize>,
    faults: HashMap<DirectoryOp, VecDeque<DirectoryError>>,
    /// Ids that vanish right after the next `create_group` on them fails
    /// with `AlreadyExists`.
    vanish_after_conflict: BTreeSet<String>,
}

/// Directory held entirely in memory.
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
    list_delay: Mutex<Duration>,
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use `clock` as the creation time source for new groups.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            list_delay: Mutex::new(Duration::ZERO),
            clock: Box::new(clock),
        }
    }

    // ── test & admin helpers ─────────────────────────────────────────

    /// Insert (or replace) a group directly, bypassing the trait.
    pub fn insert(&self, session: Session) {
        self.insert_with_members(session, std::iter::empty::<String>());
    }

    pub fn insert_with_members<I, S>(&self, mut session: Session, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let members: BTreeSet<String> = members.into_iter().map(Into::into).collect();
        session.member_count = members.len() as u32;
        self.inner.lock().groups.insert(
            session.id.clone(),
            Group { session, members },
        );
    }

    /// Record activity on a group.
    pub fn touch(&self, id: &str, at: DateTime<Utc>) {
        if let Some(g) = self.inner.lock().groups.get_mut(id) {
            g.session.last_active_at = Some(at);
        }
    }

    /// Remove a user from a group; returns whether they were a member.
    pub fn remove_member(&self, id: &str, user_id: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.groups.get_mut(id) {
            Some(g) => {
                let removed = g.members.remove(user_id);
                g.session.member_count = g.members.len() as u32;
                removed
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().groups.contains_key(id)
    }

    pub fn session(&self, id: &str) -> Option<Session> {
        self.inner.lock().groups.get(id).map(|g| g.session.clone())
    }

    pub fn members(&self, id: &str) -> Vec<String> {
        self.inner
            .lock()
            .groups
            .get(id)
            .map(|g| g.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of times `op` has been invoked (including injected failures).
    pub fn calls(&self, op: DirectoryOp) -> usize {
        self.inner.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Make the next `times` invocations of `op` fail with `error`.
    pub fn inject_failures(&self, op: DirectoryOp, error: DirectoryError, times: usize) {
        let mut inner = self.inner.lock();
        let queue = inner.faults.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Delete `id` as soon as a create on it next reports `AlreadyExists`,
    /// simulating a group reaped between create and lookup.
    pub fn vanish_after_conflict(&self, id: impl Into<String>) {
        self.inner.lock().vanish_after_conflict.insert(id.into());
    }

    /// Delay every `list_groups` call by `delay`.
    pub fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.lock() = delay;
    }

    /// Count the call and pop a scripted failure, if any.
    fn enter(&self, op: DirectoryOp) -> DirectoryResult<()> {
        let mut inner = self.inner.lock();
        *inner.calls.entry(op).or_insert(0) += 1;
        match inner.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryProvider for MemoryDirectory {
    async fn create_group(&self, req: &CreateGroup) -> DirectoryResult<()> {
        self.enter(DirectoryOp::CreateGroup)?;
        let created_at = (self.clock)();
        let mut inner = self.inner.lock();
        if inner.groups.contains_key(&req.id) {
            if inner.vanish_after_conflict.remove(&req.id) {
                inner.groups.remove(&req.id);
            }
            return Err(DirectoryError::AlreadyExists { id: req.id.clone() });
        }
        let mut members = BTreeSet::new();
        members.insert(req.initial_member.clone());
        let session = Session::from_metadata(req.id.clone(), req.metadata.clone(), created_at, 1);
        inner.groups.insert(req.id.clone(), Group { session, members });
        Ok(())
    }

    async fn get_groups(&self, ids: &[String]) -> DirectoryResult<Vec<Session>> {
        self.enter(DirectoryOp::GetGroups)?;
        let inner = self.inner.lock();
        Ok(ids
            .iter()
            .filter_map(|id| inner.groups.get(id).map(|g| g.session.clone()))
            .collect())
    }

    async fn list_groups(&self, filter: &GroupFilter) -> DirectoryResult<Vec<String>> {
        self.enter(DirectoryOp::ListGroups)?;
        let delay = *self.list_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let inner = self.inner.lock();
        Ok(inner
            .groups
            .values()
            .filter(|g| filter.matches(&g.session))
            .map(|g| g.session.id.clone())
            .collect())
    }

    async fn add_member(&self, id: &str, user_id: &str) -> DirectoryResult<()> {
        self.enter(DirectoryOp::AddMember)?;
        let mut inner = self.inner.lock();
        let group = inner
            .groups
            .get_mut(id)
            .ok_or_else(|| DirectoryError::NotFound { id: id.to_owned() })?;
        group.members.insert(user_id.to_owned());
        group.session.member_count = group.members.len() as u32;
        Ok(())
    }

    async fn delete_groups(&self, ids: &[String]) -> DirectoryResult<DeleteOutcome> {
        self.enter(DirectoryOp::DeleteGroups)?;
        let mut inner = self.inner.lock();
        for id in ids {
            inner.groups.remove(id);
        }
        Ok(DeleteOutcome {
            deleted: ids.to_vec(),
            failed: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SessionKind, SessionMetadata, Sharer};

    fn create(id: &str, hash: &str) -> CreateGroup {
        CreateGroup {
            id: id.into(),
            name: "Movie Night".into(),
            initial_member: "alice".into(),
            metadata: SessionMetadata {
                content_hash: hash.into(),
                display_name: "Movie Night".into(),
                kind: SessionKind::Online,
                sharer: Sharer {
                    id: "alice".into(),
                    name: "Alice".into(),
                    color_hue: None,
                },
                source_path: None,
                image: None,
            },
        }
    }

    #[tokio::test]
    async fn second_create_reports_already_exists() {
        let dir = MemoryDirectory::new();
        dir.create_group(&create("abc123", "abc123")).await.unwrap();
        let err = dir.create_group(&create("abc123", "abc123")).await.unwrap_err();
        assert_eq!(err, DirectoryError::AlreadyExists { id: "abc123".into() });
        assert_eq!(dir.calls(DirectoryOp::CreateGroup), 2);
        assert_eq!(dir.members("abc123"), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let dir = MemoryDirectory::new();
        dir.inject_failures(DirectoryOp::ListGroups, DirectoryError::Transient("503".into()), 2);
        assert!(dir.list_groups(&GroupFilter::All).await.is_err());
        assert!(dir.list_groups(&GroupFilter::All).await.is_err());
        assert!(dir.list_groups(&GroupFilter::All).await.is_ok());
        assert_eq!(dir.calls(DirectoryOp::ListGroups), 3);
    }

    #[tokio::test]
    async fn add_member_is_idempotent() {
        let dir = MemoryDirectory::new();
        dir.create_group(&create("abc123", "abc123")).await.unwrap();
        dir.add_member("abc123", "bob").await.unwrap();
        dir.add_member("abc123", "bob").await.unwrap();
        assert_eq!(dir.session("abc123").unwrap().member_count, 2);
    }

    #[tokio::test]
    async fn add_member_to_unknown_group_is_not_found() {
        let dir = MemoryDirectory::new();
        let err = dir.add_member("nope", "bob").await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn get_groups_omits_unknown_ids() {
        let dir = MemoryDirectory::new();
        dir.create_group(&create("abc123", "abc123")).await.unwrap();
        let found = dir
            .get_groups(&["abc123".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(matches!(
            dir.get_group("missing").await,
            Err(DirectoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deleting_missing_ids_counts_as_deleted() {
        let dir = MemoryDirectory::new();
        dir.create_group(&create("abc123", "abc123")).await.unwrap();
        let outcome = dir
            .delete_groups(&["abc123".to_string(), "gone".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome.deleted.len(), 2);
        assert!(dir.is_empty());
    }

    #[tokio::test]
    async fn vanish_after_conflict_removes_group_once() {
        let dir = MemoryDirectory::new();
        dir.create_group(&create("abc123", "abc123")).await.unwrap();
        dir.vanish_after_conflict("abc123");
        assert!(dir.create_group(&create("abc123", "abc123")).await.is_err());
        assert!(!dir.contains("abc123"));
        dir.create_group(&create("abc123", "abc123")).await.unwrap();
    }
}
