//! Merged view over all cached repository indexes
//!
//! Built fresh for every resolution from whatever is on disk; no network.
//! Resolution is deterministic: given the same cache state, the same
//! reference always resolves to the same entry.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::RegistryFile;
use crate::error::{RepoError, Result};
use crate::index::{compare_versions, ChartEntry};
use crate::store::MetadataStore;

/// One chart version record tagged with its originating repository
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedEntry {
    /// Name of the repository this entry came from
    pub repository: String,
    /// The index record itself
    pub entry: ChartEntry,
}

/// Merge of all cached per-repository indexes
#[derive(Debug, Default)]
pub struct UnifiedIndex {
    charts: HashMap<String, Vec<SourcedEntry>>,
}

impl UnifiedIndex {
    /// Build the merged view from the registry and the on-disk cache.
    ///
    /// Repositories contribute entries in registration order, which is what
    /// resolution tie-breaks key off. A repository whose cache is missing or
    /// corrupt contributes nothing.
    pub fn build(store: &MetadataStore, registry: &RegistryFile) -> Self {
        let mut charts: HashMap<String, Vec<SourcedEntry>> = HashMap::new();

        for repo in &registry.repositories {
            let Some(index) = store.read_cached_index(&repo.name) else {
                tracing::debug!("repository {} has no usable cached index, skipping", repo.name);
                continue;
            };
            for (chart_name, entries) in index.entries {
                charts
                    .entry(chart_name)
                    .or_default()
                    .extend(entries.into_iter().map(|entry| SourcedEntry {
                        repository: repo.name.clone(),
                        entry,
                    }));
            }
        }

        Self { charts }
    }

    /// All merged records for a chart, in merge order
    pub fn get(&self, chart: &str) -> Option<&[SourcedEntry]> {
        self.charts.get(chart).map(|v| v.as_slice())
    }

    /// Chart names present in the merged view
    pub fn chart_names(&self) -> Vec<&str> {
        self.charts.keys().map(|s| s.as_str()).collect()
    }

    /// Resolve a chart reference to exactly one entry.
    ///
    /// With a version, the first exact match in merge order wins: the same
    /// version published by two repositories resolves to the one registered
    /// earliest. Without a version, the highest version under
    /// precedence-ordered comparison wins, with the same earliest-registered
    /// tie-break on equal versions.
    pub fn resolve(&self, chart: &str, version: Option<&str>) -> Result<&SourcedEntry> {
        let candidates = self.charts.get(chart).ok_or_else(|| RepoError::ChartNotFound {
            name: chart.to_string(),
        })?;

        match version {
            Some(version) => candidates
                .iter()
                .find(|c| c.entry.version == version)
                .ok_or_else(|| RepoError::VersionNotFound {
                    name: chart.to_string(),
                    version: version.to_string(),
                    available: self.available_versions(chart),
                }),
            None => {
                // Strictly-greater replacement keeps the earliest-merged
                // entry on version ties.
                let mut best: Option<&SourcedEntry> = None;
                for candidate in candidates {
                    let replace = match best {
                        Some(current) => {
                            compare_versions(&candidate.entry.version, &current.entry.version)
                                == Ordering::Greater
                        }
                        None => true,
                    };
                    if replace {
                        best = Some(candidate);
                    }
                }
                best.ok_or_else(|| RepoError::ChartNotFound {
                    name: chart.to_string(),
                })
            }
        }
    }

    fn available_versions(&self, chart: &str) -> String {
        match self.charts.get(chart) {
            Some(candidates) if !candidates.is_empty() => candidates
                .iter()
                .map(|c| c.entry.version.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            _ => "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryEntry;
    use crate::index::RepositoryIndex;

    fn entry(name: &str, version: &str) -> ChartEntry {
        ChartEntry {
            name: name.to_string(),
            version: version.to_string(),
            urls: vec![format!("https://charts.example.com/{}-{}.tgz", name, version)],
            ..Default::default()
        }
    }

    fn store_with(repos: &[(&str, &[ChartEntry])]) -> (tempfile::TempDir, MetadataStore, RegistryFile) {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path());
        let mut registry = RegistryFile::default();

        for (repo_name, entries) in repos {
            registry.upsert(
                RepositoryEntry::new(*repo_name, format!("https://{}.example.com", repo_name))
                    .unwrap(),
            );
            let mut index = RepositoryIndex::default();
            for e in *entries {
                index.add_entry(e.clone());
            }
            store.write_cached_index(repo_name, &index).unwrap();
        }

        (dir, store, registry)
    }

    #[test]
    fn test_latest_version_wins_without_version() {
        let (_dir, store, registry) = store_with(&[(
            "stable",
            &[entry("nginx", "1.2.0"), entry("nginx", "1.4.0"), entry("nginx", "1.3.5")],
        )]);
        let unified = UnifiedIndex::build(&store, &registry);

        let resolved = unified.resolve("nginx", None).unwrap();
        assert_eq!(resolved.entry.version, "1.4.0");
    }

    #[test]
    fn test_exact_version_match() {
        let (_dir, store, registry) = store_with(&[(
            "stable",
            &[entry("nginx", "1.2.0"), entry("nginx", "1.4.0")],
        )]);
        let unified = UnifiedIndex::build(&store, &registry);

        let resolved = unified.resolve("nginx", Some("1.2.0")).unwrap();
        assert_eq!(resolved.entry.version, "1.2.0");
    }

    #[test]
    fn test_version_not_found() {
        let (_dir, store, registry) =
            store_with(&[("stable", &[entry("nginx", "1.2.0")])]);
        let unified = UnifiedIndex::build(&store, &registry);

        let err = unified.resolve("nginx", Some("9.9.9")).unwrap_err();
        match err {
            RepoError::VersionNotFound { name, version, available } => {
                assert_eq!(name, "nginx");
                assert_eq!(version, "9.9.9");
                assert!(available.contains("1.2.0"));
            }
            other => panic!("expected VersionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_chart() {
        let (_dir, store, registry) =
            store_with(&[("stable", &[entry("nginx", "1.2.0")])]);
        let unified = UnifiedIndex::build(&store, &registry);

        assert!(matches!(
            unified.resolve("missing-chart", None),
            Err(RepoError::ChartNotFound { .. })
        ));
    }

    #[test]
    fn test_same_version_tie_break_prefers_earliest_registered() {
        let (_dir, store, registry) = store_with(&[
            ("first", &[entry("nginx", "1.4.0")]),
            ("second", &[entry("nginx", "1.4.0")]),
        ]);
        let unified = UnifiedIndex::build(&store, &registry);

        let exact = unified.resolve("nginx", Some("1.4.0")).unwrap();
        assert_eq!(exact.repository, "first");

        let latest = unified.resolve("nginx", None).unwrap();
        assert_eq!(latest.repository, "first");
    }

    #[test]
    fn test_higher_version_beats_earlier_repository() {
        let (_dir, store, registry) = store_with(&[
            ("first", &[entry("nginx", "1.4.0")]),
            ("second", &[entry("nginx", "1.5.0")]),
        ]);
        let unified = UnifiedIndex::build(&store, &registry);

        let latest = unified.resolve("nginx", None).unwrap();
        assert_eq!(latest.repository, "second");
        assert_eq!(latest.entry.version, "1.5.0");
    }

    #[test]
    fn test_missing_cache_is_degraded_not_fatal() {
        let (_dir, store, mut registry) =
            store_with(&[("stable", &[entry("nginx", "1.2.0")])]);
        // registered but never fetched
        registry.upsert(RepositoryEntry::new("ghost", "https://ghost.example.com").unwrap());

        let unified = UnifiedIndex::build(&store, &registry);
        let resolved = unified.resolve("nginx", None).unwrap();
        assert_eq!(resolved.repository, "stable");
    }

    #[test]
    fn test_semver_beats_unparseable_versions() {
        let (_dir, store, registry) = store_with(&[(
            "stable",
            &[entry("tool", "latest"), entry("tool", "0.1.0")],
        )]);
        let unified = UnifiedIndex::build(&store, &registry);

        let resolved = unified.resolve("tool", None).unwrap();
        assert_eq!(resolved.entry.version, "0.1.0");
    }
}
