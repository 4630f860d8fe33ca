//! Credential resolution for authenticated upstream hosts.

use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub token: String,
}

/// Resolves credentials for an upstream host. `None` means anonymous access.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, host: &str) -> Result<Option<Credential>, RemoteError>;
}

/// JSON credential file mapping host names to credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialsFile {
    #[serde(default)]
    pub hosts: BTreeMap<String, Credential>,
}

impl CredentialsFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `credentials.json` under the user's Bindery config
    /// directory (`$XDG_CONFIG_HOME/bindery`, falling back to
    /// `~/.config/bindery`).
    pub fn load_default() -> Result<Self, RemoteError> {
        Self::load(&config_dir()?.join("credentials.json"))
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid credentials file: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), RemoteError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RemoteError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl CredentialResolver for CredentialsFile {
    fn resolve(&self, host: &str) -> Result<Option<Credential>, RemoteError> {
        Ok(self.hosts.get(host).cloned())
    }
}

/// Bindery's per-user config directory, honoring the XDG base-directory
/// convention before the home-relative fallback.
fn config_dir() -> Result<PathBuf, RemoteError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("bindery"));
        }
    }
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".config").join("bindery")),
        _ => Err(RemoteError::Config(
            "no config directory: neither XDG_CONFIG_HOME nor HOME is available".to_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let mut creds = CredentialsFile::new();
        creds.hosts.insert(
            "registry.example.com".to_owned(),
            Credential {
                username: "robot".to_owned(),
                token: "secret123".to_owned(),
            },
        );
        creds.save(&path).unwrap();

        let loaded = CredentialsFile::load(&path).unwrap();
        assert_eq!(loaded, creds);
    }

    #[test]
    fn resolve_unknown_host_is_anonymous() {
        let creds = CredentialsFile::new();
        assert_eq!(creds.resolve("registry.example.com").unwrap(), None);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CredentialsFile::load(&path),
            Err(RemoteError::Config(_))
        ));
    }
}
