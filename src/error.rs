//! Error taxonomy for patch transactions.
//!
//! [`Rejection`] is a user-input problem: the caller gets it back as a short
//! text response and can fix the request. [`PatchError`] aborts the call:
//! environment faults, missing identity, and permission denial.

use crate::edit::SpliceError;
use crate::matcher::MatchError;
use crate::tracker::StaleError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("path is a directory, not a file: {}", .0.display())]
    IsDirectory(PathBuf),

    #[error("file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("file is not valid UTF-8 text: {}", .0.display())]
    NotUtf8(PathBuf),

    #[error(transparent)]
    Stale(#[from] StaleError),

    #[error("old_string not found in file when ignoring whitespace differences")]
    PatternNotFound,

    #[error(
        "old_string matches {count} locations in file when ignoring whitespace differences. \
         Include more surrounding context to make it unique"
    )]
    PatternAmbiguous { count: usize },

    #[error("new content is the same as old content. No changes made.")]
    NoChange,
}

impl From<MatchError> for Rejection {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::NotFound => Rejection::PatternNotFound,
            MatchError::Ambiguous { count } => Rejection::PatternAmbiguous { count },
        }
    }
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("session ID and message ID are required for editing files")]
    MissingIdentity,

    #[error("permission denied to write {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("failed to access file {}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create parent directories for {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: SpliceError,
    },

    #[error("failed to write file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: SpliceError,
    },

    #[error("failed to splice content of {}", .path.display())]
    Splice {
        path: PathBuf,
        #[source]
        source: SpliceError,
    },
}

impl PatchError {
    /// True for the policy rejection, which a caller may retry after asking
    /// for permission again.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, PatchError::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_errors_stay_distinct() {
        assert_eq!(
            Rejection::from(MatchError::NotFound).to_string(),
            "old_string not found in file when ignoring whitespace differences"
        );
        let ambiguous = Rejection::from(MatchError::Ambiguous { count: 3 }).to_string();
        assert!(ambiguous.starts_with("old_string matches 3 locations"));
    }

    #[test]
    fn test_fatal_errors_keep_source() {
        use std::error::Error as _;

        let err = PatchError::Read {
            path: PathBuf::from("/w/a.rs"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to read file /w/a.rs");
        assert!(err.source().is_some());
        assert!(!err.is_permission_denied());
    }
}
