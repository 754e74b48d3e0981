//! Error types for type generation.

use thiserror::Error;

use crate::diagnostic::{Diagnostic, Position};
use crate::vfs::VfsError;

/// Error while resolving or generating a type.
///
/// Errors are scoped to one FQN and are `Clone` so a failed parse can be
/// memoized alongside successful ones.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// A backing file could not be read.
    #[error("cannot read {path}: {message}")]
    Io {
        /// Path of the unreadable resource.
        path: String,
        /// Underlying error message.
        message: String,
    },

    /// Resource content could not be parsed.
    #[error("malformed resource for {fqn}: {message}")]
    Malformed {
        /// Type being generated.
        fqn: String,
        /// Parser message.
        message: String,
        /// Where parsing failed, if known.
        position: Option<Position>,
    },

    /// A file or directory capability was used that its variant lacks.
    #[error(transparent)]
    Unsupported(VfsError),

    /// More than one file backs a single-file model and the policy rejects it.
    #[error("{fqn} is backed by {count} files")]
    AmbiguousBackingSet {
        /// Type with the ambiguous backing set.
        fqn: String,
        /// Number of backing files.
        count: usize,
    },

    /// No driver knows the type.
    #[error("unknown type: {fqn}")]
    NotFound {
        /// Requested name.
        fqn: String,
    },

    /// A model cannot exist without backing files.
    #[error("no backing files for {fqn}")]
    EmptyBackingSet {
        /// Type without files.
        fqn: String,
    },
}

impl GenError {
    /// A parse failure without a position.
    pub fn malformed(fqn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            fqn: fqn.into(),
            message: message.into(),
            position: None,
        }
    }

    /// A parse failure at `position`.
    pub fn malformed_at(fqn: impl Into<String>, message: impl Into<String>, position: Position) -> Self {
        Self::Malformed {
            fqn: fqn.into(),
            message: message.into(),
            position: Some(position),
        }
    }

    /// Diagnostic describing this error for `fqn`.
    pub fn to_diagnostic(&self, fqn: &str, path: Option<&str>) -> Diagnostic {
        let message = match self {
            Self::Malformed { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let mut diagnostic = Diagnostic::error(fqn, message);
        if let Some(path) = path {
            diagnostic = diagnostic.with_path(path);
        }
        if let Self::Malformed {
            position: Some(position),
            ..
        } = self
        {
            diagnostic = diagnostic.with_position(*position);
        }
        diagnostic
    }
}

impl From<VfsError> for GenError {
    fn from(err: VfsError) -> Self {
        match err {
            VfsError::Unsupported { .. } => Self::Unsupported(err),
            VfsError::NotFound(ref path)
            | VfsError::Io { ref path, .. }
            | VfsError::Archive { ref path, .. }
            | VfsError::InvalidPath(ref path) => Self::Io {
                path: path.clone(),
                message: err.to_string(),
            },
            VfsError::Network { ref url, .. } => Self::Io {
                path: url.clone(),
                message: err.to_string(),
            },
        }
    }
}

/// Result alias for generation.
pub type GenResult<T> = Result<T, GenError>;
