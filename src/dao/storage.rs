use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure surfaced by a session store, whatever the backing medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not complete the requested operation.
    #[error("session storage unavailable: {message}")]
    Unavailable {
        /// What the store was trying to do when it failed.
        message: String,
        /// Error reported by the backing medium.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Wrap a backend failure together with the operation it interrupted.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
