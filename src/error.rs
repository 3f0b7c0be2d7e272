//! Library error type
//!
//! Every library operation returns [`LibraryError`]. The CLI wraps these in
//! `anyhow` for reporting; callers that need to branch on the failure use
//! [`LibraryError::kind`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid: {0}")]
    Invalid(String),

    #[error("Malformed file {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("Pipeline '{pipeline}' references missing fragment: {reference}")]
    UnresolvedRef { pipeline: String, reference: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Task cancelled")]
    Cancelled,
}

/// Fieldless view of [`LibraryError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Invalid,
    Malformed,
    UnresolvedRef,
    Io,
    Cancelled,
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::NotFound(_) => ErrorKind::NotFound,
            LibraryError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            LibraryError::Invalid(_) => ErrorKind::Invalid,
            LibraryError::Malformed { .. } => ErrorKind::Malformed,
            LibraryError::UnresolvedRef { .. } => ErrorKind::UnresolvedRef,
            LibraryError::Io { .. } => ErrorKind::Io,
            LibraryError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        LibraryError::Malformed {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Attaches operation context to `io::Error`s, in the spirit of
/// `anyhow::Context`.
pub(crate) trait IoContext<T> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoContext<T> for std::result::Result<T, io::Error> {
    fn io_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| LibraryError::Io {
            context: f().into(),
            source,
        })
    }
}
