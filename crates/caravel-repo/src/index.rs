//! Repository index types
//!
//! Helm-compatible `index.yaml` format, trimmed to the fields the engine
//! consumes.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{RepoError, Result};

/// A repository's index document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryIndex {
    /// API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// When this index was generated
    #[serde(default = "Utc::now")]
    pub generated: DateTime<Utc>,

    /// Chart versions indexed by chart name
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartEntry>>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

impl Default for RepositoryIndex {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            generated: Utc::now(),
            entries: HashMap::new(),
        }
    }
}

impl RepositoryIndex {
    /// Parse an index from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RepoError::Serialization(e.to_string()))
    }

    /// Parse an index from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let yaml = std::str::from_utf8(bytes)
            .map_err(|e| RepoError::Serialization(format!("Invalid UTF-8: {}", e)))?;
        Self::from_yaml(yaml)
    }

    /// Serialize the index to YAML
    pub fn to_yaml(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(yaml)
    }

    /// Get all versions of a chart
    pub fn get(&self, name: &str) -> Option<&Vec<ChartEntry>> {
        self.entries.get(name)
    }

    /// Add an entry to the index
    pub fn add_entry(&mut self, entry: ChartEntry) {
        self.entries
            .entry(entry.name.clone())
            .or_default()
            .push(entry);
    }

    /// Number of chart version records across all charts
    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    /// Whether the index lists no charts at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One chart version record in an index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartEntry {
    /// Chart name
    pub name: String,

    /// Chart version (semver)
    pub version: String,

    /// Application version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// URLs to download the chart archive
    #[serde(default)]
    pub urls: Vec<String>,

    /// SHA256 digest of the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Deprecated flag
    #[serde(default)]
    pub deprecated: bool,
}

impl ChartEntry {
    /// Get the primary download URL
    pub fn download_url(&self) -> Option<&str> {
        self.urls.first().map(|s| s.as_str())
    }

    /// Parse version as semver
    pub fn parsed_version(&self) -> Option<Version> {
        Version::parse(&self.version).ok()
    }
}

/// Precedence-ordered version comparison.
///
/// Parseable semver wins over unparseable strings; two unparseable versions
/// fall back to lexical comparison so ordering stays total.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a).ok(), Version::parse(b).ok()) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}
