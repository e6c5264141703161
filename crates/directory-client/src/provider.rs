//! The `DirectoryProvider` trait defines the interface for all group
//! directory backends (REST, in-process, test doubles).

use async_trait::async_trait;
use wp_domain::error::{DirectoryError, DirectoryResult};

use crate::model::{CreateGroup, DeleteOutcome, GroupFilter, Session};

/// Identifies a directory operation in logs, trace events and fault
/// injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
    CreateGroup,
    GetGroups,
    ListGroups,
    AddMember,
    DeleteGroups,
}

impl DirectoryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateGroup => "create_group",
            Self::GetGroups => "get_groups",
            Self::ListGroups => "list_groups",
            Self::AddMember => "add_member",
            Self::DeleteGroups => "delete_groups",
        }
    }
}

impl std::fmt::Display for DirectoryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Abstraction over the external group-chat directory.
///
/// The directory is the only arbiter of id uniqueness: `create_group`
/// must fail with [`DirectoryError::AlreadyExists`] when the id is taken,
/// and that failure is the expected signal channel resolution relies on.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Create a group under exactly `req.id`.
    async fn create_group(&self, req: &CreateGroup) -> DirectoryResult<()>;

    /// Batch lookup.  Ids the directory does not know are omitted from the
    /// result rather than failing the whole batch.
    async fn get_groups(&self, ids: &[String]) -> DirectoryResult<Vec<Session>>;

    /// Single lookup; `NotFound` when the id is unknown.
    async fn get_group(&self, id: &str) -> DirectoryResult<Session> {
        self.get_groups(&[id.to_owned()])
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| DirectoryError::NotFound { id: id.to_owned() })
    }

    /// Ids of every group matching `filter`.
    async fn list_groups(&self, filter: &GroupFilter) -> DirectoryResult<Vec<String>>;

    /// Add `user_id` to the group.  Adding an existing member succeeds.
    async fn add_member(&self, id: &str, user_id: &str) -> DirectoryResult<()>;

    /// Best-effort bulk delete.  Per-id failures are reported in the
    /// outcome; ids that are already gone count as deleted.
    async fn delete_groups(&self, ids: &[String]) -> DirectoryResult<DeleteOutcome>;
}
