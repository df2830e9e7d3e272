use thiserror::Error;

/// A target path rejected before any upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPath {
    #[error("filename must not be empty")]
    EmptyFilename,
    #[error("filename '{0}' must not contain '/'")]
    SeparatorInFilename(String),
    #[error("path '{0}' must not start with '/'")]
    LeadingSeparator(String),
}

/// Directory plus filename of a file inside a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    directory: String,
    filename: String,
}

impl FileReference {
    pub fn new(directory_path: &str, filename: &str) -> Result<Self, InvalidPath> {
        if filename.is_empty() {
            return Err(InvalidPath::EmptyFilename);
        }
        if filename.contains('/') {
            return Err(InvalidPath::SeparatorInFilename(filename.to_owned()));
        }
        if directory_path.starts_with('/') {
            return Err(InvalidPath::LeadingSeparator(directory_path.to_owned()));
        }
        Ok(Self {
            directory: directory_path.trim_end_matches('/').to_owned(),
            filename: filename.to_owned(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// `directory/filename`, or the bare filename at the repository root.
    pub fn full_path(&self) -> String {
        if self.directory.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.directory, self.filename)
        }
    }
}

impl std::fmt::Display for FileReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// Everything needed to create or update one file.
#[derive(Debug, Clone)]
pub struct FileWriteRequest {
    pub repository: String,
    pub target: FileReference,
    pub content: String,
    pub commit_message: String,
    pub expected_content_hash: Option<String>,
    pub expected_line_count: Option<usize>,
}

impl FileWriteRequest {
    pub fn new(
        repository: &str,
        target: FileReference,
        content: impl Into<String>,
        commit_message: &str,
    ) -> Self {
        Self {
            repository: repository.to_owned(),
            target,
            content: content.into(),
            commit_message: commit_message.to_owned(),
            expected_content_hash: None,
            expected_line_count: None,
        }
    }

    #[must_use]
    pub fn with_expected_hash(mut self, hash: Option<String>) -> Self {
        self.expected_content_hash = hash;
        self
    }

    #[must_use]
    pub fn with_expected_lines(mut self, lines: Option<usize>) -> Self {
        self.expected_line_count = lines;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_separator() {
        let r = FileReference::new("sub", "f.txt").unwrap();
        assert_eq!(r.full_path(), "sub/f.txt");
    }

    #[test]
    fn root_directory_yields_bare_filename() {
        let r = FileReference::new("", "root.txt").unwrap();
        assert_eq!(r.full_path(), "root.txt");
    }

    #[test]
    fn trailing_separator_is_collapsed() {
        let r = FileReference::new("src/", "new.txt").unwrap();
        assert_eq!(r.full_path(), "src/new.txt");
    }

    #[test]
    fn nested_directory_kept_verbatim() {
        let r = FileReference::new("a/b/c", "d.rs").unwrap();
        assert_eq!(r.to_string(), "a/b/c/d.rs");
    }

    #[test]
    fn filename_with_separator_rejected() {
        assert_eq!(
            FileReference::new("src", "a/b.txt"),
            Err(InvalidPath::SeparatorInFilename("a/b.txt".to_owned()))
        );
    }

    #[test]
    fn empty_filename_rejected() {
        assert_eq!(
            FileReference::new("src", ""),
            Err(InvalidPath::EmptyFilename)
        );
    }

    #[test]
    fn leading_separator_rejected() {
        assert!(matches!(
            FileReference::new("/src", "a.txt"),
            Err(InvalidPath::LeadingSeparator(_))
        ));
    }
}
