//! Data Transfer Objects matching the group directory's REST API.
//!
//! Field names use `PascalCase` on the wire and `snake_case` in Rust code
//! via `#[serde(rename_all = "PascalCase")]`.  Channel metadata travels in
//! `AppDefinedData` as JSON-encoded string values.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CreateGroup, Session, SessionKind, Sharer};

/// `AppDefinedData` keys used for channel metadata.
pub const KEY_SHARER: &str = "sharer";
pub const KEY_KIND: &str = "video_type";
pub const KEY_HASH: &str = "video_hash";
pub const KEY_PATH: &str = "path";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Common envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Status fields present on every response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiStatus {
    #[serde(default)]
    pub action_status: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_info: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberAccount {
    #[serde(rename = "Member_Account")]
    pub member_account: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppDefinedField {
    pub key: String,
    pub value: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// create_group
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGroupRequest {
    #[serde(rename = "Type")]
    pub group_type: String,
    pub group_id: String,
    pub name: String,
    pub introduction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face_url: Option<String>,
    pub member_list: Vec<MemberAccount>,
    pub app_defined_data: Vec<AppDefinedField>,
}

impl CreateGroupRequest {
    pub fn from_create(req: &CreateGroup) -> Self {
        let meta = &req.metadata;
        let encode = |v: serde_json::Value| v.to_string();
        Self {
            group_type: "Private".into(),
            group_id: req.id.clone(),
            name: req.name.clone(),
            introduction: meta.display_name.clone(),
            face_url: meta.image.clone(),
            member_list: vec![MemberAccount {
                member_account: req.initial_member.clone(),
            }],
            app_defined_data: vec![
                AppDefinedField {
                    key: KEY_SHARER.into(),
                    value: encode(serde_json::json!(meta.sharer)),
                },
                AppDefinedField {
                    key: KEY_KIND.into(),
                    value: encode(serde_json::json!(meta.kind)),
                },
                AppDefinedField {
                    key: KEY_HASH.into(),
                    value: encode(serde_json::json!(meta.content_hash)),
                },
                AppDefinedField {
                    key: KEY_PATH.into(),
                    value: encode(serde_json::json!(meta.source_path)),
                },
            ],
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// get_group_info
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetGroupInfoRequest {
    pub group_id_list: Vec<String>,
    pub response_filter: GroupInfoFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupInfoFilter {
    #[serde(rename = "GroupBaseInfoFilter")]
    pub base: Vec<String>,
    #[serde(rename = "AppDefinedDataFilter_Group")]
    pub app_defined: Vec<String>,
}

impl GetGroupInfoRequest {
    pub fn new(ids: &[String]) -> Self {
        let base = [
            "GroupId",
            "Name",
            "Introduction",
            "FaceUrl",
            "CreateTime",
            "LastMsgTime",
            "MemberNum",
        ];
        Self {
            group_id_list: ids.to_vec(),
            response_filter: GroupInfoFilter {
                base: base.iter().map(|s| s.to_string()).collect(),
                app_defined: [KEY_SHARER, KEY_KIND, KEY_HASH, KEY_PATH]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetGroupInfoResponse {
    #[serde(default)]
    pub group_info: Vec<GroupInfo>,
}

/// One entry of `GroupInfo`.  Entries carry their own `ErrorCode`; an
/// unknown id comes back as an entry with a non-zero code.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupInfo {
    pub group_id: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub error_info: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub face_url: String,
    #[serde(default)]
    pub create_time: i64,
    #[serde(default)]
    pub last_msg_time: i64,
    #[serde(default)]
    pub member_num: u32,
    #[serde(default)]
    pub app_defined_data: Vec<AppDefinedField>,
}

impl GroupInfo {
    fn field(&self, key: &str) -> Option<serde_json::Value> {
        self.app_defined_data
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| serde_json::from_str(&f.value).ok())
    }

    /// Convert a directory entry into a channel.  Groups that were not
    /// created through this service still convert; missing metadata reads
    /// as empty so they never match a real content hash.
    pub fn into_session(self) -> Session {
        let content_hash = self
            .field(KEY_HASH)
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        let kind = self
            .field(KEY_KIND)
            .and_then(|v| serde_json::from_value::<SessionKind>(v).ok())
            .unwrap_or(SessionKind::Other);
        let sharer = self
            .field(KEY_SHARER)
            .and_then(|v| serde_json::from_value::<Sharer>(v).ok())
            .unwrap_or_default();
        let source_path = self
            .field(KEY_PATH)
            .and_then(|v| v.as_str().map(str::to_owned));

        let display_name = if self.introduction.is_empty() {
            self.name.clone()
        } else {
            self.introduction.clone()
        };

        Session {
            created_at: epoch(self.create_time).unwrap_or_default(),
            last_active_at: epoch(self.last_msg_time),
            image: parse_face_url(&self.face_url),
            member_count: self.member_num,
            id: self.group_id,
            content_hash,
            display_name,
            kind,
            sharer,
            source_path,
        }
    }
}

fn epoch(secs: i64) -> Option<DateTime<Utc>> {
    if secs <= 0 {
        return None;
    }
    Utc.timestamp_opt(secs, 0).single()
}

/// Older clients stored the image JSON-encoded (`"null"` or `"\"url\""`);
/// accept both that and a plain URL.
fn parse_face_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Ok(serde_json::Value::Null) => None,
        _ => Some(trimmed.to_owned()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// get_appid_group_list
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupListRequest {
    pub limit: u32,
    pub next: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupListResponse {
    #[serde(default)]
    pub group_id_list: Vec<GroupIdEntry>,
    #[serde(default)]
    pub next: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupIdEntry {
    pub group_id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// add_group_member / destroy_group
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddMemberRequest {
    pub group_id: String,
    /// `1` suppresses the "member joined" system message.
    pub silence: u8,
    pub member_list: Vec<MemberAccount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DestroyGroupRequest {
    pub group_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SessionMetadata;

    #[test]
    fn create_request_encodes_metadata_as_json_strings() {
        let req = CreateGroup {
            id: "abc123".into(),
            name: "Movie Night".into(),
            initial_member: "u1".into(),
            metadata: SessionMetadata {
                content_hash: "abc123".into(),
                display_name: "Movie Night".into(),
                kind: SessionKind::Online,
                sharer: Sharer {
                    id: "u1".into(),
                    name: "Ann".into(),
                    color_hue: Some(120),
                },
                source_path: None,
                image: None,
            },
        };
        let body = serde_json::to_value(CreateGroupRequest::from_create(&req)).unwrap();
        assert_eq!(body["Type"], "Private");
        assert_eq!(body["GroupId"], "abc123");
        assert_eq!(body["MemberList"][0]["Member_Account"], "u1");
        assert!(body.get("FaceUrl").is_none());

        let fields = body["AppDefinedData"].as_array().unwrap();
        let hash = fields.iter().find(|f| f["Key"] == KEY_HASH).unwrap();
        assert_eq!(hash["Value"], "\"abc123\"");
        let path = fields.iter().find(|f| f["Key"] == KEY_PATH).unwrap();
        assert_eq!(path["Value"], "null");
    }

    #[test]
    fn group_info_converts_to_session() {
        let raw = serde_json::json!({
            "GroupId": "abc123-1",
            "ErrorCode": 0,
            "Name": "Movie Ni",
            "Introduction": "Movie Night",
            "FaceUrl": "\"https://img.example/cover.png\"",
            "CreateTime": 1_700_000_000,
            "LastMsgTime": 0,
            "MemberNum": 3,
            "AppDefinedData": [
                { "Key": "video_hash", "Value": "\"abc123\"" },
                { "Key": "video_type", "Value": "\"online\"" },
                { "Key": "sharer", "Value": "{\"id\":\"u1\",\"name\":\"Ann\",\"color_hue\":null}" },
                { "Key": "path", "Value": "\"/movies/a.mkv\"" }
            ]
        });
        let info: GroupInfo = serde_json::from_value(raw).unwrap();
        let session = info.into_session();

        assert_eq!(session.id, "abc123-1");
        assert_eq!(session.content_hash, "abc123");
        assert_eq!(session.display_name, "Movie Night");
        assert_eq!(session.kind, SessionKind::Online);
        assert_eq!(session.sharer.name, "Ann");
        assert_eq!(session.source_path.as_deref(), Some("/movies/a.mkv"));
        assert_eq!(session.image.as_deref(), Some("https://img.example/cover.png"));
        assert_eq!(session.member_count, 3);
        assert_eq!(session.created_at.timestamp(), 1_700_000_000);
        assert!(session.last_active_at.is_none());
    }

    #[test]
    fn foreign_group_converts_with_empty_hash() {
        let raw = serde_json::json!({ "GroupId": "ops-room", "Name": "ops", "MemberNum": 2 });
        let info: GroupInfo = serde_json::from_value(raw).unwrap();
        let session = info.into_session();
        assert_eq!(session.content_hash, "");
        assert_eq!(session.kind, SessionKind::Other);
        assert_eq!(session.display_name, "ops");
    }

    #[test]
    fn face_url_variants() {
        assert_eq!(parse_face_url(""), None);
        assert_eq!(parse_face_url("null"), None);
        assert_eq!(parse_face_url("\"a.png\"").as_deref(), Some("a.png"));
        assert_eq!(parse_face_url("https://x/a.png").as_deref(), Some("https://x/a.png"));
    }
}
