//! On-disk metadata store
//!
//! Owns the registry file and the per-repository index cache. Registry
//! mutations are serialized across processes by an advisory lock on a
//! sibling marker file; cached indexes need no lock because every write is
//! a whole-file atomic replacement.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;

use crate::config::RegistryFile;
use crate::error::{RepoError, Result};
use crate::index::RepositoryIndex;

/// Interval between lock acquisition attempts
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Overall bound on lock acquisition
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the store root (used by tests)
pub const HOME_ENV: &str = "CARAVEL_HOME";

/// Durable store for the registry and cached indexes
#[derive(Debug, Clone)]
pub struct MetadataStore {
    root: PathBuf,
}

impl MetadataStore {
    /// Create a store rooted at a specific directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the default location, honoring `CARAVEL_HOME`
    pub fn from_env() -> Result<Self> {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return Ok(Self::new(home));
        }
        let config_dir = dirs::config_dir().ok_or_else(|| RepoError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine config directory",
        )))?;
        Ok(Self::new(config_dir.join("caravel")))
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the registry document
    pub fn registry_path(&self) -> PathBuf {
        self.root.join("repositories.yaml")
    }

    /// Path of the registry lock marker: the registry path with its
    /// extension swapped for `.lock`, so the marker sits beside the file it
    /// guards and readers of the registry itself are never blocked.
    pub fn lock_path(&self) -> PathBuf {
        self.registry_path().with_extension("lock")
    }

    /// Directory holding cached index documents
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Path of one repository's cached index
    pub fn cached_index_path(&self, name: &str) -> PathBuf {
        self.cache_dir().join(format!("{}-index.yaml", name))
    }

    /// Read the registry. A missing file is an empty registry, not an error.
    pub fn read_registry(&self) -> Result<RegistryFile> {
        let path = self.registry_path();
        match fs::read_to_string(&path) {
            Ok(content) => RegistryFile::from_yaml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the registry. Callers must hold the registry lock for the
    /// whole read-modify-write sequence. The document is written to a
    /// temporary file and renamed into place so a crash cannot leave a
    /// truncated registry behind.
    pub fn write_registry(&self, registry: &RegistryFile) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let yaml = registry.to_yaml()?;
        atomic_write(&self.root, &self.registry_path(), yaml.as_bytes())
    }

    /// Acquire the registry lock with the default timeout
    pub async fn lock_registry(&self) -> Result<RegistryGuard> {
        self.lock_registry_timeout(LOCK_TIMEOUT).await
    }

    /// Acquire the registry lock, polling at `LOCK_POLL_INTERVAL` up to the
    /// given timeout. On timeout no mutation has happened and the caller
    /// gets `LockTimeout`.
    pub async fn lock_registry_timeout(&self, timeout: Duration) -> Result<RegistryGuard> {
        fs::create_dir_all(&self.root)?;
        let lock_path = self.lock_path();
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;

        let started = std::time::Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(RegistryGuard { file }),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(RepoError::LockTimeout {
                    path: lock_path.display().to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            let remaining = timeout - elapsed;
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(remaining)).await;
        }
    }

    /// Read one repository's cached index. Absence or corruption is a valid
    /// degraded state and reads as `None`.
    pub fn read_cached_index(&self, name: &str) -> Option<RepositoryIndex> {
        let path = self.cached_index_path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!("cached index {} unreadable: {}", path.display(), e);
                }
                return None;
            }
        };
        match RepositoryIndex::from_bytes(&bytes) {
            Ok(index) => Some(index),
            Err(e) => {
                tracing::debug!("cached index {} corrupt: {}", path.display(), e);
                None
            }
        }
    }

    /// Replace one repository's cached index wholesale. The replacement is
    /// atomic with respect to concurrent readers.
    pub fn write_cached_index(&self, name: &str, index: &RepositoryIndex) -> Result<()> {
        let cache_dir = self.cache_dir();
        fs::create_dir_all(&cache_dir)?;
        let yaml = index.to_yaml()?;
        atomic_write(&cache_dir, &self.cached_index_path(name), yaml.as_bytes())
    }
}

/// Write-then-rename within one directory. The temp file lives beside the
/// destination so the rename never crosses filesystems.
fn atomic_write(dir: &Path, dest: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| RepoError::Io(e.error))?;
    Ok(())
}

/// Held registry lock. Dropping the guard releases the lock, so release
/// happens on every exit path, error paths included.
#[derive(Debug)]
pub struct RegistryGuard {
    file: fs::File,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}
