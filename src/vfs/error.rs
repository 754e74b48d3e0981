//! Error types for virtual file system operations.

use thiserror::Error;

/// Error during a virtual file system operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    /// The file or directory variant does not offer this capability.
    #[error("operation '{operation}' is not supported for {path}")]
    Unsupported {
        /// Capability that was requested.
        operation: &'static str,
        /// Path or URL of the resource.
        path: String,
    },

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying I/O failure.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path of the resource.
        path: String,
        /// Error message from the operating system.
        message: String,
    },

    /// Archive could not be opened or read.
    #[error("archive error in {path}: {message}")]
    Archive {
        /// Path of the archive.
        path: String,
        /// Error message from the archive reader.
        message: String,
    },

    /// URL-backed read failed.
    #[error("network error for {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Error message from the HTTP client.
        message: String,
    },

    /// A path string could not be normalized.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl VfsError {
    /// Wrap an I/O error for `path`.
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path.into());
        }
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Capability not offered by this variant.
    pub fn unsupported(operation: &'static str, path: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            path: path.into(),
        }
    }

    /// Whether this is a programming error rather than a runtime condition.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Result alias for virtual file system operations.
pub type VfsResult<T> = Result<T, VfsError>;
