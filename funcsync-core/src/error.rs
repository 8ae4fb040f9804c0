//! Error types for funcsync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TableName;

/// Errors raised by a [`RegistryStore`](crate::store::RegistryStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named table does not exist in the store.
    #[error("table '{table}' not found")]
    TableNotFound { table: TableName },

    /// `create_table` was called for a table that already exists.
    #[error("table '{table}' already exists")]
    TableAlreadyExists { table: TableName },

    /// The table exists but is still being created and cannot accept writes.
    #[error("table '{table}' is not active yet")]
    TableNotActive { table: TableName },

    /// An update targeted an item that is not present.
    #[error("item '{file_name}' not found in table '{table}'")]
    ItemNotFound { table: TableName, file_name: String },

    /// The table name cannot be used as a storage key.
    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse table file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// `true` for the "absent" family: missing table or missing item.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::TableNotFound { .. } | StoreError::ItemNotFound { .. }
        )
    }
}

/// Errors raised by the [`Registry`](crate::registry::Registry) adapter.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The readiness poll ran out of attempts.
    #[error("table '{table}' did not become active after {attempts} attempts")]
    TableNotReady { table: TableName, attempts: u32 },
}

/// Errors raised while loading [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
