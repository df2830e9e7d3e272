use crate::RemoteError;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub const ENV_TOKEN: &str = "REPOGATE_GITHUB_TOKEN";
pub const ENV_OWNER: &str = "REPOGATE_GITHUB_OWNER";
pub const ENV_API_URL: &str = "REPOGATE_GITHUB_API_URL";
pub const ENV_BRANCH: &str = "REPOGATE_GITHUB_BRANCH";

/// Credential and account identity for the GitHub API.
///
/// Resolved once at startup and moved into the client. A missing token or
/// owner is a startup failure, never a per-request one.
#[derive(Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    pub owner: String,
    pub token: String,
    /// Branch to read and commit on instead of the repository default.
    #[serde(default)]
    pub branch: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("owner", &self.owner)
            .field("token", &"[REDACTED]")
            .field("branch", &self.branch)
            .finish()
    }
}

impl GitHubConfig {
    pub fn new(owner: &str, token: &str) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            owner: owner.to_owned(),
            token: token.to_owned(),
            branch: None,
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, url: &str) -> Self {
        url.trim_end_matches('/').clone_into(&mut self.api_url);
        self
    }

    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_owned());
        self
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, RemoteError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RemoteError> {
        let token = lookup(ENV_TOKEN)
            .ok_or_else(|| RemoteError::Config(format!("{ENV_TOKEN} is not set")))?;
        let owner = lookup(ENV_OWNER)
            .ok_or_else(|| RemoteError::Config(format!("{ENV_OWNER} is not set")))?;

        let mut config = Self::new(&owner, &token);
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config = config.with_api_url(&url);
        }
        if let Some(branch) = lookup(ENV_BRANCH).filter(|v| !v.trim().is_empty()) {
            config = config.with_branch(&branch);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid GitHub config: {e}")))?;
        let trimmed = config.api_url.trim_end_matches('/').len();
        config.api_url.truncate(trimmed);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.token.trim().is_empty() {
            return Err(RemoteError::Config("GitHub token is empty".to_owned()));
        }
        if self.owner.trim().is_empty() {
            return Err(RemoteError::Config("GitHub owner is empty".to_owned()));
        }
        if self.api_url.is_empty() {
            return Err(RemoteError::Config("GitHub API URL is empty".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn config_from_lookup_defaults() {
        let config =
            GitHubConfig::from_lookup(lookup_from(&[(ENV_TOKEN, "t0ken"), (ENV_OWNER, "octo")]))
                .unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.owner, "octo");
        assert_eq!(config.token, "t0ken");
        assert!(config.branch.is_none());
    }

    #[test]
    fn config_from_lookup_overrides() {
        let config = GitHubConfig::from_lookup(lookup_from(&[
            (ENV_TOKEN, "t0ken"),
            (ENV_OWNER, "octo"),
            (ENV_API_URL, "http://127.0.0.1:9000/"),
            (ENV_BRANCH, "develop"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.branch.as_deref(), Some("develop"));
    }

    #[test]
    fn missing_token_is_config_error() {
        let err = GitHubConfig::from_lookup(lookup_from(&[(ENV_OWNER, "octo")])).unwrap_err();
        assert!(matches!(err, RemoteError::Config(ref m) if m.contains(ENV_TOKEN)));
    }

    #[test]
    fn missing_owner_is_config_error() {
        let err = GitHubConfig::from_lookup(lookup_from(&[(ENV_TOKEN, "t")])).unwrap_err();
        assert!(matches!(err, RemoteError::Config(ref m) if m.contains(ENV_OWNER)));
    }

    #[test]
    fn blank_token_rejected() {
        let err = GitHubConfig::from_lookup(lookup_from(&[(ENV_TOKEN, "  "), (ENV_OWNER, "o")]))
            .unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    fn config_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github.json");
        std::fs::write(
            &path,
            r#"{"owner": "octo", "token": "secret123", "api_url": "https://ghe.example.com/api/v3/"}"#,
        )
        .unwrap();

        let loaded = GitHubConfig::load(&path).unwrap();
        assert_eq!(loaded.owner, "octo");
        assert_eq!(loaded.token, "secret123");
        assert_eq!(loaded.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn config_load_missing_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github.json");
        std::fs::write(&path, r#"{"owner": "octo"}"#).unwrap();
        assert!(matches!(
            GitHubConfig::load(&path),
            Err(RemoteError::Config(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let config = GitHubConfig::new("octo", "super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
