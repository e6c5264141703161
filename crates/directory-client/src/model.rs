//! Channel data model as seen by clients of the directory.
//!
//! Field names on the wire follow the long-standing channel JSON shape
//! (`name`, `hash`, `video_type`, `path`, epoch-second timestamps) so
//! existing watch-party clients can consume the API unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Listing class of a channel.  Only [`SessionKind::Online`] channels are
/// shown in the public online listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Online,
    Local,
    Bilibili,
    Alist,
    #[serde(other)]
    Other,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Local => "local",
            Self::Bilibili => "bilibili",
            Self::Alist => "alist",
            Self::Other => "other",
        }
    }
}

/// The user who started a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sharer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color_hue: Option<u16>,
}

/// What a publisher supplies when sharing media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "video_type")]
    pub kind: SessionKind,
    pub sharer: Sharer,
    #[serde(rename = "path", default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One watch-party channel, backed by one directory group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "video_type")]
    pub kind: SessionKind,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub sharer: Sharer,
    #[serde(rename = "path", default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build the view of a channel that was just created from `meta`.
    pub fn from_metadata(
        id: impl Into<String>,
        meta: SessionMetadata,
        created_at: DateTime<Utc>,
        member_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            content_hash: meta.content_hash,
            display_name: meta.display_name,
            kind: meta.kind,
            created_at,
            sharer: meta.sharer,
            source_path: meta.source_path,
            image: meta.image,
            member_count,
            last_active_at: None,
        }
    }

    /// Last activity, falling back to creation time when the directory
    /// has never recorded any.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_active_at.unwrap_or(self.created_at)
    }
}

/// Parameters for creating one directory group.
#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub id: String,
    /// Short group name (already truncated to the directory's limit).
    pub name: String,
    /// Placed in the initial member list.
    pub initial_member: String,
    pub metadata: SessionMetadata,
}

/// Server-side selection applied when listing groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFilter {
    All,
    /// Groups whose creation time is at or before the cutoff.
    CreatedBefore(DateTime<Utc>),
    /// Groups whose last activity is at or before the cutoff.
    InactiveSince(DateTime<Utc>),
}

impl GroupFilter {
    pub fn matches(&self, session: &Session) -> bool {
        match self {
            Self::All => true,
            Self::CreatedBefore(cutoff) => session.created_at <= *cutoff,
            Self::InactiveSince(cutoff) => session.last_activity() <= *cutoff,
        }
    }
}

/// Result of a best-effort bulk delete.
#[derive(Debug, Clone, Default)]
pub struct DeleteOutcome {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, wp_domain::error::DirectoryError)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session_at(created: DateTime<Utc>, active: Option<DateTime<Utc>>) -> Session {
        Session {
            id: "abc123".into(),
            content_hash: "abc123".into(),
            display_name: "Movie Night".into(),
            kind: SessionKind::Online,
            created_at: created,
            sharer: Sharer::default(),
            source_path: None,
            image: None,
            member_count: 0,
            last_active_at: active,
        }
    }

    #[test]
    fn session_serializes_with_channel_field_names() {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap();
        let json = serde_json::to_value(session_at(created, None)).unwrap();
        assert_eq!(json["hash"], "abc123");
        assert_eq!(json["name"], "Movie Night");
        assert_eq!(json["video_type"], "online");
        assert_eq!(json["created_at"], created.timestamp());
    }

    #[test]
    fn unknown_kind_reads_as_other() {
        let kind: SessionKind = serde_json::from_str("\"youtube\"").unwrap();
        assert_eq!(kind, SessionKind::Other);
    }

    #[test]
    fn inactive_filter_falls_back_to_creation_time() {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 3, 0, 0).unwrap();
        let cutoff = Utc.with_ymd_and_hms(2026, 1, 15, 4, 0, 0).unwrap();
        let never_active = session_at(created, None);
        let recently_active = session_at(created, Some(cutoff + chrono::Duration::minutes(5)));

        let filter = GroupFilter::InactiveSince(cutoff);
        assert!(filter.matches(&never_active));
        assert!(!filter.matches(&recently_active));
        assert!(GroupFilter::CreatedBefore(cutoff).matches(&recently_active));
    }
}
