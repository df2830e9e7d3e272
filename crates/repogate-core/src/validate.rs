//! Gate for file updates.
//!
//! Content is checked in a fixed order, cheapest first, and the first failing
//! check wins: non-empty, integrity hash, length plausibility, syntax. All checks
//! are pure; nothing here touches the network.

use crate::syntax::{SyntaxLanguage, SyntaxPolicy};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Content is empty")]
    EmptyContent,
    #[error("Content checksum mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("Content is shorter than expected: {actual} lines, expected about {expected}")]
    ContentTooShort { actual: usize, expected: usize },
    #[error("{language} syntax error at line {line}, column {column}: {message}")]
    SyntaxInvalid {
        language: SyntaxLanguage,
        line: usize,
        column: usize,
        message: String,
    },
}

/// Lowercase hex SHA-256 of the exact bytes of `content`.
pub fn content_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Smallest line count accepted when `expected` lines were announced: floor(0.8 × expected).
pub fn minimum_line_count(expected: usize) -> usize {
    expected / 5 * 4 + (expected % 5) * 4 / 5
}

pub fn check_not_empty(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}

pub fn check_content_hash(content: &str, expected: &str) -> Result<(), ValidationError> {
    let actual = content_sha256(content);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ValidationError::HashMismatch {
            expected: expected.to_owned(),
            actual,
        })
    }
}

pub fn check_line_count(content: &str, expected: usize) -> Result<(), ValidationError> {
    let actual = content.lines().count();
    if actual < minimum_line_count(expected) {
        return Err(ValidationError::ContentTooShort { actual, expected });
    }
    Ok(())
}

pub fn check_syntax(
    content: &str,
    filename: &str,
    policy: SyntaxPolicy,
) -> Result<(), ValidationError> {
    let Some(language) = policy.language_for(filename) else {
        return Ok(());
    };
    language
        .check(content)
        .map_err(|issue| ValidationError::SyntaxInvalid {
            language,
            line: issue.line,
            column: issue.column,
            message: issue.message,
        })
}

/// The update validation pipeline, configured with a syntax policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateValidator {
    syntax: SyntaxPolicy,
}

impl UpdateValidator {
    pub fn new(syntax: SyntaxPolicy) -> Self {
        Self { syntax }
    }

    pub fn syntax_policy(&self) -> SyntaxPolicy {
        self.syntax
    }

    pub fn validate_update(
        &self,
        content: &str,
        expected_hash: Option<&str>,
        expected_line_count: Option<usize>,
        filename: &str,
    ) -> Result<(), ValidationError> {
        check_not_empty(content)?;
        if let Some(expected) = expected_hash {
            check_content_hash(content, expected)?;
        }
        if let Some(expected) = expected_line_count {
            check_line_count(content, expected)?;
        }
        check_syntax(content, filename, self.syntax)
    }
}
