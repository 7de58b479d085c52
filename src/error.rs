use std::borrow::Cow;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StudyVaultError>;

/// Canonical error surface for the study data layer.
#[derive(Debug, Error)]
pub enum StudyVaultError {
    #[error("Storage unavailable: {reason}")]
    StorageUnavailable { reason: Cow<'static, str> },

    #[error("Storage quota exceeded: {reason}")]
    QuotaExceeded { reason: Cow<'static, str> },

    #[error("I/O error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: Cow<'static, str> },

    /// SQLite failures that say nothing about durability (bad SQL, decode errors).
    #[error("Database error: {0}")]
    Database(rusqlite::Error),
}

impl StudyVaultError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    /// True for the durability failures a caller may offer to retry.
    #[must_use]
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. } | Self::QuotaExceeded { .. }
        )
    }
}

impl From<std::io::Error> for StudyVaultError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}

impl From<rusqlite::Error> for StudyVaultError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::DiskFull) => Self::QuotaExceeded {
                reason: err.to_string().into(),
            },
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::PermissionDenied,
            ) => Self::StorageUnavailable {
                reason: err.to_string().into(),
            },
            _ => Self::Database(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_full_maps_to_quota() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            Some("database or disk is full".into()),
        );
        let mapped = StudyVaultError::from(err);
        assert!(matches!(mapped, StudyVaultError::QuotaExceeded { .. }));
        assert!(mapped.is_storage_failure());
    }

    #[test]
    fn cannot_open_maps_to_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            None,
        );
        let mapped = StudyVaultError::from(err);
        assert!(matches!(mapped, StudyVaultError::StorageUnavailable { .. }));
    }

    #[test]
    fn decode_errors_are_not_storage_failures() {
        let err = rusqlite::Error::InvalidColumnType(
            7,
            "size_bytes".to_string(),
            rusqlite::types::Type::Text,
        );
        let mapped = StudyVaultError::from(err);
        assert!(matches!(mapped, StudyVaultError::Database(_)));
        assert!(!mapped.is_storage_failure());
    }

    #[test]
    fn input_errors_are_not_storage_failures() {
        let err = StudyVaultError::InvalidInput {
            reason: "bad".into(),
        };
        assert!(!err.is_storage_failure());
    }
}
