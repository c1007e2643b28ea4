//! Storage error handling
//!
//! Errors from the local files Folio owns: the drafts file and files the
//! local backend writes. I/O failures are classified so the CLI can say
//! what to do about them.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from local file storage
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: cannot access '{path}'. Check file permissions.")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left while writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored file exists but does not parse
    #[error("'{path}' is corrupt: {details}")]
    Corrupt { path: PathBuf, details: String },

    #[error("Failed to encode data for '{path}': {details}")]
    Encode { path: PathBuf, details: String },

    /// The final rename of an atomic write failed; the target is untouched
    #[error("Could not move '{from}' into place at '{to}': {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify a failed write
    pub fn from_write(error: io::Error, path: PathBuf) -> Self {
        match classify(&error) {
            Some(Class::Permission) => StorageError::PermissionDenied {
                path,
                source: error,
            },
            Some(Class::Full) => StorageError::DiskFull {
                path,
                source: error,
            },
            None => StorageError::Write {
                path,
                source: error,
            },
        }
    }

    /// Classify a failed read
    pub fn from_read(error: io::Error, path: PathBuf) -> Self {
        match classify(&error) {
            Some(Class::Permission) => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ => StorageError::Read {
                path,
                source: error,
            },
        }
    }

    /// Whether the user can fix this and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::Corrupt { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check the permissions of the data directory and the content root.")
            }
            StorageError::Corrupt { .. } => Some(
                "The drafts file was edited by hand or partially written. \
                 Fix or remove it (drafts in it will be lost) and try again.",
            ),
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and is writable.")
            }
            _ => None,
        }
    }
}

enum Class {
    Permission,
    Full,
}

fn classify(error: &io::Error) -> Option<Class> {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return Some(Class::Permission);
    }

    // No stable ErrorKind for a full disk on every platform
    let msg = error.to_string().to_lowercase();
    let full = ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle));
    full.then_some(Class::Full)
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
