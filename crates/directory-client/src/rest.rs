//! REST implementation of [`DirectoryProvider`].
//!
//! `RestDirectoryClient` wraps a `reqwest::Client` and translates every
//! trait method into the corresponding call on the directory's group
//! service.  It makes exactly one HTTP attempt per call and classifies the
//! outcome; retrying transient failures is the caller's policy.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;
use wp_domain::config::DirectoryConfig;
use wp_domain::error::{DirectoryError, DirectoryResult, Error, Result};
use wp_domain::trace::TraceEvent;

use crate::model::{CreateGroup, DeleteOutcome, GroupFilter, Session};
use crate::provider::DirectoryProvider;
use crate::types::{
    AddMemberRequest, ApiStatus, CreateGroupRequest, DestroyGroupRequest, GetGroupInfoRequest,
    GetGroupInfoResponse, GroupListRequest, GroupListResponse, MemberAccount,
};

/// Maximum ids accepted by one `get_group_info` call.
const GROUP_INFO_BATCH: usize = 50;
/// Page size for `get_appid_group_list`.
const GROUP_LIST_PAGE: u32 = 10_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error codes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map a non-zero directory `ErrorCode` onto a [`DirectoryError`].
///
/// `subject` is the group id the call was about, used for the
/// `AlreadyExists` / `NotFound` variants.
pub fn classify_error_code(code: i64, info: &str, subject: &str) -> DirectoryError {
    match code {
        // Group id already taken (by anyone / by this app).
        10021 | 10025 => DirectoryError::AlreadyExists {
            id: subject.to_owned(),
        },
        // Group dismissed / group id invalid.
        10010 | 10015 => DirectoryError::NotFound {
            id: subject.to_owned(),
        },
        // Bad command word, bad parameters, no permission.
        10003 | 10004 | 10007 => DirectoryError::Rejected {
            code,
            message: info.to_owned(),
        },
        _ => DirectoryError::Transient(format!("error code {code}: {info}")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST-based client for the group directory.
///
/// Created once and reused for the lifetime of the gateway process.
/// The underlying `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestDirectoryClient {
    http: Client,
    base_url: String,
    app_id: String,
    admin_identifier: String,
    user_sig: String,
    timeout: Duration,
}

impl RestDirectoryClient {
    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build a new client from the shared `DirectoryConfig`.
    pub fn new(cfg: &DirectoryConfig) -> Result<Self> {
        let user_sig = cfg.resolve_user_sig().ok_or_else(|| {
            Error::Config(format!(
                "directory.user_sig is not set and {} is empty",
                cfg.user_sig_env
            ))
        })?;

        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            app_id: cfg.app_id.clone(),
            admin_identifier: cfg.admin_identifier.clone(),
            user_sig,
            timeout,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Build the full URL for a group-service command like `create_group`.
    fn url(&self, command: &str) -> String {
        format!("{}/v4/group_open_http_svc/{command}", self.base_url)
    }

    /// Attach the authentication query string and trace header.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let random = ((Uuid::new_v4().as_u128() & 0xFFFF_FFFF) as u32).to_string();
        rb.header("X-Trace-Id", Uuid::new_v4().to_string()).query(&[
            ("sdkappid", self.app_id.as_str()),
            ("identifier", self.admin_identifier.as_str()),
            ("usersig", self.user_sig.as_str()),
            ("random", random.as_str()),
            ("contenttype", "json"),
        ])
    }

    /// POST one command and decode the response.
    ///
    /// * 5xx, timeouts and connection failures are `Transient`.
    /// * Other 4xx are `Rejected` (a malformed request will not improve).
    /// * A 2xx with a non-zero `ErrorCode` is classified by
    ///   [`classify_error_code`] against `subject`.
    async fn call<B, R>(&self, command: &str, subject: &str, body: &B) -> DirectoryResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let start = Instant::now();
        let result = self
            .decorate(self.http.post(self.url(command)))
            .json(body)
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                emit_call(command, e.status().map(|s| s.as_u16()).unwrap_or(0), -1, duration_ms);
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        let text = resp.text().await.map_err(from_reqwest)?;

        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            emit_call(command, status.as_u16(), -1, duration_ms);
            return Err(DirectoryError::Transient(format!(
                "{command} returned {status}: {text}"
            )));
        }
        if status.is_client_error() {
            emit_call(command, status.as_u16(), -1, duration_ms);
            return Err(DirectoryError::Rejected {
                code: i64::from(status.as_u16()),
                message: format!("{command}: {text}"),
            });
        }

        let api: ApiStatus = serde_json::from_str(&text).map_err(|e| {
            DirectoryError::Transient(format!("{command}: unreadable response: {e}: {text}"))
        })?;
        emit_call(command, status.as_u16(), api.error_code, duration_ms);

        if api.error_code != 0 {
            return Err(classify_error_code(api.error_code, &api.error_info, subject));
        }

        serde_json::from_str(&text).map_err(|e| {
            DirectoryError::Transient(format!("{command}: failed to parse response: {e}: {text}"))
        })
    }

    async fn destroy_one(&self, id: &str) -> DirectoryResult<()> {
        let req = DestroyGroupRequest {
            group_id: id.to_owned(),
        };
        let _: ApiStatus = self.call("destroy_group", id, &req).await?;
        Ok(())
    }

    async fn all_group_ids(&self) -> DirectoryResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut next = 0u64;
        loop {
            let req = GroupListRequest {
                limit: GROUP_LIST_PAGE,
                next,
            };
            let page: GroupListResponse = self.call("get_appid_group_list", "", &req).await?;
            ids.extend(page.group_id_list.into_iter().map(|e| e.group_id));
            if page.next == 0 || page.next == next {
                break;
            }
            next = page.next;
        }
        Ok(ids)
    }
}

fn emit_call(command: &str, status: u16, error_code: i64, duration_ms: u64) {
    TraceEvent::DirectoryCall {
        operation: command.to_owned(),
        status,
        error_code,
        duration_ms,
    }
    .emit();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl DirectoryProvider for RestDirectoryClient {
    async fn create_group(&self, req: &CreateGroup) -> DirectoryResult<()> {
        let body = CreateGroupRequest::from_create(req);
        let _: ApiStatus = self.call("create_group", &req.id, &body).await?;
        Ok(())
    }

    async fn get_groups(&self, ids: &[String]) -> DirectoryResult<Vec<Session>> {
        let mut sessions = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(GROUP_INFO_BATCH) {
            let subject = chunk.first().map(String::as_str).unwrap_or_default();
            let resp: GetGroupInfoResponse = self
                .call("get_group_info", subject, &GetGroupInfoRequest::new(chunk))
                .await?;
            for info in resp.group_info {
                if info.error_code == 0 {
                    sessions.push(info.into_session());
                    continue;
                }
                match classify_error_code(info.error_code, &info.error_info, &info.group_id) {
                    DirectoryError::NotFound { .. } => {}
                    other => return Err(other),
                }
            }
        }
        Ok(sessions)
    }

    async fn list_groups(&self, filter: &GroupFilter) -> DirectoryResult<Vec<String>> {
        let ids = self.all_group_ids().await?;
        if *filter == GroupFilter::All {
            return Ok(ids);
        }
        // The directory has no server-side time filter; narrow client-side.
        let sessions = self.get_groups(&ids).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| filter.matches(s))
            .map(|s| s.id)
            .collect())
    }

    async fn add_member(&self, id: &str, user_id: &str) -> DirectoryResult<()> {
        let req = AddMemberRequest {
            group_id: id.to_owned(),
            silence: 1,
            member_list: vec![MemberAccount {
                member_account: user_id.to_owned(),
            }],
        };
        let _: ApiStatus = self.call("add_group_member", id, &req).await?;
        Ok(())
    }

    async fn delete_groups(&self, ids: &[String]) -> DirectoryResult<DeleteOutcome> {
        let mut outcome = DeleteOutcome::default();
        for id in ids {
            match self.destroy_one(id).await {
                Ok(()) | Err(DirectoryError::NotFound { .. }) => outcome.deleted.push(id.clone()),
                Err(e) => {
                    tracing::warn!(channel_id = %id, error = %e, "destroy_group failed");
                    outcome.failed.push((id.clone(), e));
                }
            }
        }
        Ok(outcome)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a [`DirectoryError`].
///
/// Timeouts, connection failures and body read errors are all transient;
/// a request that could not even be built is rejected.
pub fn from_reqwest(e: reqwest::Error) -> DirectoryError {
    if e.is_builder() {
        DirectoryError::Rejected {
            code: 0,
            message: e.to_string(),
        }
    } else if e.is_timeout() {
        DirectoryError::Transient(format!("timeout: {e}"))
    } else {
        DirectoryError::Transient(e.to_string())
    }
}
