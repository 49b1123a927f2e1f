//! State backend trait and error types

use std::collections::HashMap;

use async_trait::async_trait;
use scw_core::provider::{ErrorKind, ProviderError};
use scw_core::resource::Value;
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another process
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    /// State file is corrupted, or written by a newer format version
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// Refuses to overwrite state that belongs to another lineage
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.holder.to_string(),
            operation: lock.operation.clone(),
        }
    }

    pub fn unsupported_backend(backend_type: impl Into<String>) -> Self {
        Self::UnsupportedBackend(backend_type.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<BackendError> for ProviderError {
    fn from(err: BackendError) -> Self {
        let kind = match &err {
            BackendError::UnsupportedBackend(_) | BackendError::Configuration(_) => {
                ErrorKind::Configuration
            }
            _ => ErrorKind::State,
        };
        ProviderError::with_kind(kind, err.to_string()).with_cause(err)
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for the tracked state, with locking for concurrent access control
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state. Returns `None` if nothing was ever written.
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state. Callers increment the serial first.
    ///
    /// Fails with [`BackendError::LineageMismatch`] when the stored state
    /// belongs to another lineage.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire the lock for `operation`, unless an unexpired lock is held
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock previously returned by [`StateBackend::acquire_lock`]
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove the lock with the given ID regardless of who holds it
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Prepare the storage location (create parent directories, etc.)
    async fn init(&self) -> BackendResult<()>;
}

/// Configuration for a state backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend type (currently only "local")
    pub backend_type: String,
    /// Backend-specific attributes
    pub attributes: HashMap<String, Value>,
}

impl BackendConfig {
    /// Local backend storing the state at `path`
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            backend_type: "local".to_string(),
            attributes: HashMap::from([("path".to_string(), Value::String(path.into()))]),
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_int)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockInfo;

    #[test]
    fn locked_error_carries_lock_details() {
        let lock = LockInfo::new("apply");
        match BackendError::locked(&lock) {
            BackendError::Locked {
                lock_id,
                who,
                operation,
            } => {
                assert_eq!(lock_id, lock.id);
                assert_eq!(who, lock.holder.to_string());
                assert_eq!(operation, "apply");
            }
            other => panic!("Expected Locked error, got {:?}", other),
        }
    }

    #[test]
    fn provider_error_kind_follows_backend_error() {
        let err: ProviderError = BackendError::unsupported_backend("s3").into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Unsupported backend type: s3"));

        let err: ProviderError = BackendError::Io("disk full".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn local_config_accessors() {
        let config = BackendConfig::local("state/scw.state.json");
        assert_eq!(config.backend_type, "local");
        assert_eq!(config.get_string("path"), Some("state/scw.state.json"));
        assert_eq!(config.get_int("lock_timeout_secs"), None);
    }
}
