/// Shared error type used across all watchparty crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("HTTP: {0}")]
    Http(String),

    #[error("snapshot store: {0}")]
    Store(String),

    #[error("config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a failed call against the group directory.
///
/// The variants are exactly the kinds the directory can signal.  Callers
/// are expected to match on them: `AlreadyExists` is the normal signal
/// that drives channel convergence, and only `Transient` is ever retried.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("group {id} already exists")]
    AlreadyExists { id: String },

    #[error("group {id} not found")]
    NotFound { id: String },

    /// Network failure, timeout, rate limit or server-side error.
    #[error("transient directory failure: {0}")]
    Transient(String),

    /// The directory refused the request permanently (malformed request,
    /// bad credentials, missing permission).
    #[error("directory rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

impl DirectoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Short machine-readable kind, used in logs and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "already_exists",
            Self::NotFound { .. } => "not_found",
            Self::Transient(_) => "transient",
            Self::Rejected { .. } => "rejected",
        }
    }
}

pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;
