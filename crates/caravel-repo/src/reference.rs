//! Source and target locator parsing
//!
//! A pull request names its source as `helm://host/chart[?version=...]` and
//! its target as `file://path`. Both are validated before the engine touches
//! any state.

use std::path::{Path, PathBuf};

use url::Url;

use crate::config::host_to_name;
use crate::error::{RepoError, Result};

/// A parsed chart reference
#[derive(Debug, Clone, PartialEq)]
pub struct ChartReference {
    /// Host of the repository serving the chart
    pub host: String,
    /// Chart name (the single path segment)
    pub chart: String,
    /// Requested version, if any
    pub version: Option<String>,
}

impl ChartReference {
    /// Parse a `helm://host/chart[?version=...]` locator.
    ///
    /// The path must name exactly one chart: nested segments are rejected.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| RepoError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(reference).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "helm" {
            return Err(invalid("source must use the helm:// scheme"));
        }
        let host = url
            .host_str()
            .ok_or_else(|| invalid("source is missing a repository host"))?
            .to_string();

        let path = url.path().trim_start_matches('/');
        if path.is_empty() {
            return Err(invalid("source is missing a chart name"));
        }
        if path.contains('/') {
            return Err(invalid(
                "source must contain a single path segment (the chart name)",
            ));
        }

        let version = url
            .query_pairs()
            .find(|(k, _)| k == "version")
            .map(|(_, v)| v.into_owned());

        Ok(Self {
            host,
            chart: path.to_string(),
            version,
        })
    }

    /// Registry name for this reference's repository
    pub fn repository_name(&self) -> String {
        host_to_name(&self.host)
    }

    /// Base URL of this reference's repository
    pub fn repository_url(&self) -> String {
        format!("https://{}", self.host)
    }
}

impl std::fmt::Display for ChartReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "helm://{}/{}?version={}", self.host, self.chart, v),
            None => write!(f, "helm://{}/{}", self.host, self.chart),
        }
    }
}

/// A parsed pull destination
#[derive(Debug, Clone, PartialEq)]
pub struct PullTarget {
    /// Destination path
    pub path: PathBuf,
    /// Whether an existing file at the destination may be replaced
    pub overwrite: bool,
}

impl PullTarget {
    /// Parse a `file://path` locator
    pub fn parse(target: &str, overwrite: bool) -> Result<Self> {
        let invalid = |reason: &str| RepoError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "file" {
            return Err(invalid("target must use the file:// scheme"));
        }
        let path = url
            .to_file_path()
            .map_err(|_| invalid("target is not a local filesystem path"))?;

        Ok(Self { path, overwrite })
    }

    /// A target pointing directly at a local path
    pub fn local(path: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            path: path.into(),
            overwrite,
        }
    }

    /// The concrete destination file. A target naming an existing directory
    /// receives the conventional `<chart>-<version>.tgz` inside it.
    pub fn resolve_path(&self, chart: &str, version: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}-{}.tgz", chart, version))
        } else {
            self.path.clone()
        }
    }

    /// Directory the destination file will live in
    pub fn parent_dir(&self, resolved: &Path) -> PathBuf {
        resolved
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
