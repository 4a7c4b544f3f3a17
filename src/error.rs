use thiserror::Error;

/// Why a task draft was refused. Nothing is added when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task title must not be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Rejections surfaced by [`crate::store::Store::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Stored data that could not be restored. Logged and discarded, never returned to callers.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("malformed value under `{key}`: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("unrecognised value under `{key}`: {value}")]
    Unrecognised { key: &'static str, value: String },
    #[error("stored session for `{username}` is not authenticated")]
    InvalidSession { username: String },
}

/// Failures while bringing up the file-backed store and its logger.
#[cfg(feature = "app")]
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),
    #[error("failed to start logging: {0}")]
    Logging(#[from] flexi_logger::FlexiLoggerError),
}
