//! Registry document types
//!
//! The registry is a single `repositories.yaml` listing every repository the
//! engine knows about. Entry order is registration order, and resolution
//! merges indexes in exactly that order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{RepoError, Result};

/// The persisted registry document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Registered repositories, in registration order
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

fn default_api_version() -> String {
    "caravel.dev/v1".to_string()
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            repositories: Vec::new(),
        }
    }
}

impl RegistryFile {
    /// Parse a registry document from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: Self = serde_yaml::from_str(yaml)?;
        Ok(file)
    }

    /// Serialize the registry document to YAML
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml)
    }

    /// Get a repository by name
    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.repositories.iter().find(|r| r.name == name)
    }

    /// Insert a repository, or overwrite the fields of an existing entry
    /// with the same name. An updated entry keeps its original position, so
    /// re-registering never reorders the merge sequence.
    pub fn upsert(&mut self, entry: RepositoryEntry) {
        match self.repositories.iter_mut().find(|r| r.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.repositories.push(entry),
        }
    }

    /// List all repository names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.repositories.iter().map(|r| r.name.as_str()).collect()
    }
}

/// One registered repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEntry {
    /// Unique name, derived from the source host
    pub name: String,

    /// Repository base URL
    pub url: String,

    /// Optional credentials for fetching from this repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// When this repository's index was last refreshed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl RepositoryEntry {
    /// Create a new entry, validating the URL shape
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let url = url.into();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(RepoError::InvalidRepositoryUrl {
                url,
                reason: "URL must start with http:// or https://".to_string(),
            });
        }
        url::Url::parse(&url).map_err(|e| RepoError::InvalidRepositoryUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name,
            url,
            credentials: None,
            last_updated: None,
        })
    }

    /// The URL of this repository's index document
    pub fn index_url(&self) -> String {
        format!("{}/index.yaml", self.url.trim_end_matches('/'))
    }
}

/// Derive a repository name from a host identifier.
///
/// The transliteration is deterministic and reversible for valid hosts
/// (dots become dashes), so registering the same host twice always targets
/// the same entry.
pub fn host_to_name(host: &str) -> String {
    host.replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_to_name() {
        assert_eq!(host_to_name("charts.example.com"), "charts-example-com");
        assert_eq!(host_to_name("localhost"), "localhost");
    }

    #[test]
    fn test_entry_url_validation() {
        assert!(RepositoryEntry::new("test", "https://charts.example.com").is_ok());
        assert!(RepositoryEntry::new("test", "oci://ghcr.io/org").is_err());
        assert!(RepositoryEntry::new("test", "not a url").is_err());
    }

    #[test]
    fn test_index_url() {
        let entry = RepositoryEntry::new("test", "https://charts.example.com/stable/").unwrap();
        assert_eq!(entry.index_url(), "https://charts.example.com/stable/index.yaml");
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut registry = RegistryFile::default();
        registry.upsert(RepositoryEntry::new("a", "https://a.example.com").unwrap());
        registry.upsert(RepositoryEntry::new("b", "https://b.example.com").unwrap());
        registry.upsert(RepositoryEntry::new("a", "https://a.example.com").unwrap());

        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_upsert_keeps_position() {
        let mut registry = RegistryFile::default();
        registry.upsert(RepositoryEntry::new("a", "https://a.example.com").unwrap());
        registry.upsert(RepositoryEntry::new("b", "https://b.example.com").unwrap());
        registry.upsert(RepositoryEntry::new("a", "https://a2.example.com").unwrap());

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().url, "https://a2.example.com");
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut registry = RegistryFile::default();
        registry.upsert(RepositoryEntry::new("charts-example-com", "https://charts.example.com").unwrap());

        let yaml = registry.to_yaml().unwrap();
        assert!(yaml.contains("charts-example-com"));

        let parsed = RegistryFile::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, registry);
    }

    #[test]
    fn test_empty_document_parses() {
        let parsed = RegistryFile::from_yaml("apiVersion: caravel.dev/v1\n").unwrap();
        assert!(parsed.repositories.is_empty());
    }
}
