//! Core of the repogate facade.
//!
//! This crate holds the validation pipeline every file update passes through,
//! the syntax registry it consults, the closed domain error taxonomy with its
//! translator from upstream transport failures, and the [`FileService`] that
//! orchestrates reads and writes against a [`repogate_remote::RepositoryClient`].

pub mod path;
pub mod service;
pub mod syntax;
pub mod translate;
pub mod validate;

pub use path::{FileReference, FileWriteRequest, InvalidPath};
pub use service::{FileContentResult, FileService, UTF8_ENCODING};
pub use syntax::{SyntaxLanguage, SyntaxPolicy};
pub use translate::{translate, UpstreamCall};
pub use validate::{content_sha256, UpdateValidator, ValidationError};

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Repository '{repository}' not found")]
    RepositoryNotFound { repository: String },
    #[error("File '{path}' not found in repository '{repository}'")]
    FileNotFound { repository: String, path: String },
    #[error("GitHub API error: {message}")]
    Upstream { status: u16, message: String },
    #[error("Network error: {0}")]
    UpstreamUnreachable(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// The closed set of failure categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RepositoryNotFound,
    FileNotFound,
    UpstreamError,
    UpstreamUnreachable,
    EmptyContent,
    HashMismatch,
    ContentTooShort,
    SyntaxInvalid,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RepositoryNotFound => "RepositoryNotFound",
            Self::FileNotFound => "FileNotFound",
            Self::UpstreamError => "UpstreamError",
            Self::UpstreamUnreachable => "UpstreamUnreachable",
            Self::EmptyContent => "EmptyContent",
            Self::HashMismatch => "HashMismatch",
            Self::ContentTooShort => "ContentTooShort",
            Self::SyntaxInvalid => "SyntaxInvalid",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RepositoryNotFound { .. } => ErrorKind::RepositoryNotFound,
            Self::FileNotFound { .. } => ErrorKind::FileNotFound,
            Self::Upstream { .. } => ErrorKind::UpstreamError,
            Self::UpstreamUnreachable(_) => ErrorKind::UpstreamUnreachable,
            Self::Validation(v) => match v {
                ValidationError::EmptyContent => ErrorKind::EmptyContent,
                ValidationError::HashMismatch { .. } => ErrorKind::HashMismatch,
                ValidationError::ContentTooShort { .. } => ErrorKind::ContentTooShort,
                ValidationError::SyntaxInvalid { .. } => ErrorKind::SyntaxInvalid,
            },
        }
    }

    /// Status code returned to the caller for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::RepositoryNotFound { .. } | Self::FileNotFound { .. } => 404,
            Self::Upstream { status, .. } if (400..=599).contains(status) => *status,
            Self::Upstream { .. } | Self::UpstreamUnreachable(_) => 502,
            Self::Validation(_) => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        let cases = [
            (ValidationError::EmptyContent, ErrorKind::EmptyContent),
            (
                ValidationError::HashMismatch {
                    expected: "a".to_owned(),
                    actual: "b".to_owned(),
                },
                ErrorKind::HashMismatch,
            ),
            (
                ValidationError::ContentTooShort {
                    actual: 1,
                    expected: 10,
                },
                ErrorKind::ContentTooShort,
            ),
            (
                ValidationError::SyntaxInvalid {
                    language: SyntaxLanguage::Python,
                    line: 1,
                    column: 12,
                    message: "unexpected EOF".to_owned(),
                },
                ErrorKind::SyntaxInvalid,
            ),
        ];
        for (validation, kind) in cases {
            let e = DomainError::from(validation);
            assert_eq!(e.kind(), kind);
            assert_eq!(e.http_status(), 400);
        }
    }

    #[test]
    fn upstream_status_kept_inside_error_range() {
        let e = DomainError::Upstream {
            status: 422,
            message: "sha wasn't supplied".to_owned(),
        };
        assert_eq!(e.http_status(), 422);
        let e = DomainError::Upstream {
            status: 302,
            message: "moved".to_owned(),
        };
        assert_eq!(e.http_status(), 502);
    }

    #[test]
    fn validation_message_is_transparent() {
        let e = DomainError::from(ValidationError::EmptyContent);
        assert_eq!(e.to_string(), "Content is empty");
    }

    #[test]
    fn file_not_found_message_names_path_and_repo() {
        let e = DomainError::FileNotFound {
            repository: "widgets".to_owned(),
            path: "src/a.rs".to_owned(),
        };
        assert_eq!(
            e.to_string(),
            "File 'src/a.rs' not found in repository 'widgets'"
        );
        assert_eq!(e.kind().to_string(), "FileNotFound");
    }
}
