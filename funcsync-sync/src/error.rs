//! Error types for funcsync-sync.

use thiserror::Error;

use funcsync_core::RegistryError;

/// Errors from the revision-control collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The path does not exist at the requested revision.
    #[error("file {path} does not exist at revision {revision}")]
    FileDoesNotExist { revision: String, path: String },

    #[error("commit {commit} not found")]
    CommitNotFound { commit: String },

    #[error("repository {repository} not found")]
    RepositoryNotFound { repository: String },

    /// The repository name would resolve outside the repositories root.
    #[error("invalid repository name '{0}'")]
    InvalidRepository(String),

    /// The `git` executable could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A `git` invocation exited unsuccessfully.
    #[error("`git {args}` failed (status {status}): {stderr}")]
    Git {
        args: String,
        status: i32,
        stderr: String,
    },

    /// Any other collaborator failure.
    #[error("source transport error: {0}")]
    Transport(String),
}

impl SourceError {
    /// `true` only for "file does not exist at revision".
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::FileDoesNotExist { .. })
    }
}

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// File content is not valid UTF-8.
    #[error("{path} at revision {revision} is not valid UTF-8")]
    Decode { path: String, revision: String },

    /// The trigger event does not have the expected shape.
    #[error("invalid trigger event: {0}")]
    Event(String),

    #[error("trigger event JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
