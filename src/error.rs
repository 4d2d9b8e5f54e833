//! Error types for store, middleware and persistence operations.

use thiserror::Error;

/// Errors that can occur while updating, persisting or rehydrating a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization or deserialization of a persisted envelope failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage medium rejected a read, write or removal.
    #[error("storage error: {0}")]
    Storage(String),

    /// The storage medium could not be resolved in this environment.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A migration hook failed to transform persisted state.
    #[error("migration failed from version {from}: {reason}")]
    Migration { from: u32, reason: String },

    /// Invalid storage item name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// An entry point was used without the middleware that provides it.
    #[error("middleware not installed: {0}")]
    MiddlewareMissing(&'static str),

    /// Background work was requested outside of a Tokio runtime.
    #[error("no tokio runtime available for {0}")]
    NoRuntime(&'static str),

    /// Database error from SQLx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Returns true if retrying the same storage operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Storage(_) | StoreError::Database(_))
    }

    /// Build a migration error from any displayable reason.
    pub fn migration(from: u32, reason: impl ToString) -> Self {
        StoreError::Migration {
            from,
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::InvalidName(String::new());
        assert!(err.to_string().contains("invalid name"));

        let err = StoreError::MiddlewareMissing("subscribe_with_selector");
        assert!(err.to_string().contains("subscribe_with_selector"));
    }

    #[test]
    fn test_migration_display() {
        let err = StoreError::migration(3, "unknown field");
        assert!(err.to_string().contains("version 3"));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(StoreError::Storage("disk busy".to_string()).is_retryable());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!StoreError::Serialization("bad".to_string()).is_retryable());
        assert!(!StoreError::migration(1, "nope").is_retryable());
        assert!(!StoreError::MiddlewareMissing("persist").is_retryable());
    }
}
