//! Caravel repository synchronization
//!
//! This crate implements the client side of Helm-style chart repositories:
//!
//! - **Registry management**: a locked, durable `repositories.yaml` listing
//!   every known repository, safe under concurrent invocations
//! - **Index mirroring**: per-repository `index.yaml` documents cached
//!   locally and replaced atomically on refresh
//! - **Deterministic resolution**: all cached indexes merged into one view,
//!   with an explicit earliest-registered tie-break for collisions
//! - **Atomic pulls**: chart archives land at the target path complete or
//!   not at all
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use caravel_repo::{ChartReference, HttpFetcher, MetadataStore, PullTarget, SyncClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MetadataStore::from_env()?;
//! let client = SyncClient::new(store, Arc::new(HttpFetcher::public()?));
//!
//! let source = ChartReference::parse("helm://charts.example.com/nginx?version=1.2.0")?;
//! let target = PullTarget::parse("file:///tmp/nginx.tgz", false)?;
//!
//! let report = client.pull_reference(&source, &target).await?;
//! println!("pulled {}:{}", report.chart, report.version);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency notes
//!
//! - Registry mutations serialize across processes via an advisory lock on a
//!   sibling `.lock` marker, polled with a bounded timeout
//! - Cached indexes are written with replace-then-rename, so readers never
//!   observe a half-written index and need no lock of their own

pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod index;
pub mod reference;
pub mod store;
pub mod sync;
pub mod unified;

// Re-exports for convenience
pub use config::{host_to_name, RegistryFile, RepositoryEntry};
pub use credentials::{Credentials, ResolvedCredentials, ScopedCredentials};
pub use error::{RepoError, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use index::{ChartEntry, RepositoryIndex};
pub use reference::{ChartReference, PullTarget};
pub use store::{MetadataStore, RegistryGuard, LOCK_POLL_INTERVAL, LOCK_TIMEOUT};
pub use sync::{PullReport, SyncClient};
pub use unified::{SourcedEntry, UnifiedIndex};
