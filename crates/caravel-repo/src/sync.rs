//! The synchronization engine
//!
//! `SyncClient` ties the pieces together: registering repositories under the
//! registry lock, refreshing cached indexes, resolving references against
//! the merged view, and pulling resolved archives atomically.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config::{RegistryFile, RepositoryEntry};
use crate::error::{RepoError, Result};
use crate::fetch::{Fetcher, DEFAULT_FETCH_TIMEOUT};
use crate::index::RepositoryIndex;
use crate::reference::{ChartReference, PullTarget};
use crate::store::MetadataStore;
use crate::unified::{SourcedEntry, UnifiedIndex};

/// Outcome of a completed pull, for reporting
#[derive(Debug, Clone, PartialEq)]
pub struct PullReport {
    /// Repository the chart was resolved from
    pub repository: String,
    /// Chart name
    pub chart: String,
    /// Resolved version
    pub version: String,
    /// Where the archive landed
    pub path: PathBuf,
}

/// Repository synchronization client
pub struct SyncClient {
    store: MetadataStore,
    fetcher: Arc<dyn Fetcher>,
    fetch_timeout: Duration,
}

impl SyncClient {
    /// Create a client over a store and an injected fetch capability
    pub fn new(store: MetadataStore, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            store,
            fetcher,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Override the per-fetch deadline
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Register a repository, or update an existing entry with the same
    /// name. Returns `true` when the entry is new.
    ///
    /// The whole read-modify-write runs under the registry lock, and the
    /// registry is only persisted after the repository's index has been
    /// fetched once: an entry whose index cannot be retrieved is never
    /// durably registered.
    pub async fn register(&self, mut entry: RepositoryEntry) -> Result<bool> {
        let _guard = self.store.lock_registry().await?;

        let mut registry = self.store.read_registry()?;
        let existing = registry.get(&entry.name);
        let newly_added = existing.is_none();

        // Re-registration without credentials keeps the stored ones.
        if entry.credentials.is_none() {
            entry.credentials = existing.and_then(|e| e.credentials.clone());
        }

        // Local IO failures keep their identity; transport and parse
        // failures mean the repository could not be probed.
        self.refresh_index(&entry).await.map_err(|e| match e {
            e @ RepoError::Io(_) | e @ RepoError::Serialization(_) => e,
            other => RepoError::UnreachableRepository {
                name: entry.name.clone(),
                url: entry.url.clone(),
                reason: other.to_string(),
            },
        })?;

        entry.last_updated = Some(Utc::now());
        registry.upsert(entry);
        self.store.write_registry(&registry)?;

        Ok(newly_added)
    }

    /// Fetch a repository's index document, parse it, and replace the
    /// cached copy. On any failure the previous cache remains valid:
    /// stale-but-available beats empty.
    pub async fn refresh_index(&self, entry: &RepositoryEntry) -> Result<RepositoryIndex> {
        let url = entry.index_url();
        let bytes = self.fetcher.fetch(&url, self.fetch_timeout).await?;
        let index = RepositoryIndex::from_bytes(&bytes).map_err(|e| RepoError::FetchFailed {
            url: url.clone(),
            message: format!("invalid index document: {}", e),
        })?;

        self.store.write_cached_index(&entry.name, &index)?;
        tracing::debug!(
            "refreshed index for {} ({} chart versions)",
            entry.name,
            index.len()
        );
        Ok(index)
    }

    /// Build the merged view over everything currently cached
    pub fn unified_index(&self) -> Result<UnifiedIndex> {
        let registry = self.store.read_registry()?;
        Ok(UnifiedIndex::build(&self.store, &registry))
    }

    /// Retrieve a resolved entry's archive to the target.
    ///
    /// Bytes are fetched, checked against the index digest when one is
    /// present, written to a temporary file beside the destination, and
    /// renamed into place only on full success. A failed pull leaves no
    /// temporary residue and never touches the destination.
    pub async fn pull(
        &self,
        repo_url: &str,
        resolved: &SourcedEntry,
        target: &PullTarget,
    ) -> Result<PathBuf> {
        let entry = &resolved.entry;
        let url = entry
            .download_url()
            .ok_or_else(|| RepoError::MissingDownloadUrl {
                name: entry.name.clone(),
            })?;

        // Index entries may carry archive paths relative to the repository.
        let full_url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", repo_url.trim_end_matches('/'), url)
        };

        let data = self.fetcher.fetch(&full_url, self.fetch_timeout).await?;

        if let Some(expected) = &entry.digest {
            let actual = compute_digest(&data);
            if !digest_matches(expected, &actual) {
                return Err(RepoError::IntegrityCheckFailed {
                    name: entry.name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let dest = target.resolve_path(&entry.name, &entry.version);
        if dest.exists() && !target.overwrite {
            return Err(RepoError::TargetExists {
                path: dest.display().to_string(),
            });
        }

        let parent = target.parent_dir(&dest);
        std::fs::create_dir_all(&parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(&data)?;
        tmp.flush()?;

        if target.overwrite {
            tmp.persist(&dest).map_err(|e| RepoError::Io(e.error))?;
        } else {
            tmp.persist_noclobber(&dest).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    RepoError::TargetExists {
                        path: dest.display().to_string(),
                    }
                } else {
                    RepoError::Io(e.error)
                }
            })?;
        }

        Ok(dest)
    }

    /// The single-shot operation: register (probing and refreshing the
    /// reference's repository), merge every cached index, resolve, pull.
    pub async fn pull_reference(
        &self,
        reference: &ChartReference,
        target: &PullTarget,
    ) -> Result<PullReport> {
        let entry =
            RepositoryEntry::new(reference.repository_name(), reference.repository_url())?;
        self.register(entry).await?;

        let registry = self.store.read_registry()?;
        let unified = UnifiedIndex::build(&self.store, &registry);
        let resolved = unified.resolve(&reference.chart, reference.version.as_deref())?;

        let repo = registry
            .get(&resolved.repository)
            .ok_or_else(|| RepoError::RepositoryNotFound {
                name: resolved.repository.clone(),
            })?;

        let path = self.pull(&repo.url, resolved, target).await?;

        Ok(PullReport {
            repository: resolved.repository.clone(),
            chart: resolved.entry.name.clone(),
            version: resolved.entry.version.clone(),
            path,
        })
    }
}

/// SHA256 digest of data, in the index's `sha256:` notation
fn compute_digest(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Compare digests tolerating the common prefix spellings
fn digest_matches(expected: &str, actual: &str) -> bool {
    let normalize = |d: &str| {
        d.trim()
            .to_lowercase()
            .replace("sha256:", "")
            .replace("sha256-", "")
    };
    normalize(expected) == normalize(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_digest() {
        let digest = compute_digest(b"hello world");
        assert!(digest.starts_with("sha256:"));
        assert_eq!(digest.len(), 7 + 64);
    }

    #[test]
    fn test_digest_matches() {
        assert!(digest_matches("sha256:abc123", "sha256:ABC123"));
        assert!(digest_matches("abc123", "sha256:abc123"));
        assert!(digest_matches("sha256-abc123", "sha256:abc123"));
        assert!(!digest_matches("sha256:abc123", "sha256:def456"));
    }
}
