use crate::types::InstanceId;
use thiserror::Error;

/// Store-layer error type.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Store error wrapper.
    #[error("store error: {0}")]
    Store(#[source] StoreError),
    /// Invalid identifier input.
    #[error("invalid id: {0}")]
    InvalidId(String),
    /// Numeric permission level outside the known range.
    #[error("invalid permission level: {0}")]
    InvalidPermissionLevel(u8),
    /// The instance is not known to the store.
    #[error("instance {instance} not found")]
    InstanceNotFound { instance: InstanceId },
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        Self::Store(error)
    }
}
