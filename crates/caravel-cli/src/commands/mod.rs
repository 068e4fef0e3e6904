//! CLI command implementations

pub mod pull;
pub mod repo;

use std::sync::Arc;

use caravel_repo::{Credentials, HttpFetcher, MetadataStore, ScopedCredentials, SyncClient};

use crate::error::Result;

/// Build a sync client whose fetcher carries every credential the registry
/// knows about, each scoped to its repository's URL prefix. `extra` adds a
/// credential not yet persisted (a `repo add` in progress), so it applies
/// to the registration probe itself.
pub(crate) fn sync_client(
    store: MetadataStore,
    extra: Option<(&str, &Credentials)>,
) -> Result<SyncClient> {
    let registry = store.read_registry()?;

    let mut scoped = ScopedCredentials::default();
    for entry in &registry.repositories {
        if let Some(credentials) = &entry.credentials {
            match credentials.resolve() {
                Ok(resolved) => scoped.add(&entry.url, resolved),
                Err(e) => {
                    tracing::warn!("credentials for {} unusable: {}", entry.name, e);
                }
            }
        }
    }
    if let Some((url, credentials)) = extra {
        scoped.add(url, credentials.resolve()?);
    }

    let fetcher = HttpFetcher::new(scoped)?;
    Ok(SyncClient::new(store, Arc::new(fetcher)))
}
