//! Ingestion of upstream version descriptors.
//!
//! The store is gated twice: an unchanged mirror commit skips everything, and an
//! unchanged descriptor hash skips parsing that file.

pub mod types;

pub use types::*;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::{Identity, VersionDescriptor};
use crate::store::{load_snapshot, save_snapshot};
use crate::tools::SourceControl;
use crate::utils::hash::sha1_hex;
use crate::utils::ordering::sort_desc_by_key;
use crate::utils::progress::progress;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

const LABEL: &str = "MetaStore";

pub struct MetaStore {
    config: Arc<SyncConfig>,
    snapshot: MetaSnapshot,
}

impl MetaStore {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self::with_snapshot(config, MetaSnapshot::default())
    }

    pub fn with_snapshot(config: Arc<SyncConfig>, snapshot: MetaSnapshot) -> Self {
        Self { config, snapshot }
    }

    pub async fn load(config: Arc<SyncConfig>) -> Result<Self> {
        let snapshot = load_snapshot(&config.meta_json_path(), LABEL).await?;
        Ok(Self::with_snapshot(config, snapshot))
    }

    pub async fn save(&self) -> Result<()> {
        save_snapshot(&self.config.meta_json_path(), &self.snapshot, LABEL).await
    }

    pub fn snapshot(&self) -> &MetaSnapshot {
        &self.snapshot
    }

    pub fn commit(&self) -> &str {
        &self.snapshot.commit
    }

    /// Versions, newest release first
    pub fn versions(&self) -> indexmap::map::Values<'_, String, MetaVersion> {
        self.snapshot.versions.values()
    }

    pub fn version(&self, file_id: &str) -> Option<&MetaVersion> {
        self.snapshot.versions.get(file_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &MetaRecord> {
        self.versions().flat_map(|version| version.jars.values())
    }

    /// One descriptor per version id, newest release first.
    ///
    /// When several files describe the same version, the file named after the version
    /// wins, otherwise the lexically last file id.
    pub fn current_versions(&self) -> Vec<&MetaVersion> {
        let mut chosen: IndexMap<&str, &MetaVersion> = IndexMap::new();
        for version in self.versions() {
            match chosen.get_mut(version.id.as_str()) {
                Some(current) if supersedes(version, current) => *current = version,
                Some(_) => {}
                None => {
                    chosen.insert(&version.id, version);
                }
            }
        }
        chosen.into_values().collect()
    }

    /// Release time of a version, looked up by version id or descriptor file id
    pub fn release_time(&self, version: &str) -> Result<DateTime<Utc>> {
        self.current_versions()
            .into_iter()
            .find(|v| v.id == version)
            .or_else(|| self.versions().find(|v| v.file_id == version))
            .map(|v| v.release_time)
            .ok_or_else(|| SyncError::NotFound {
                version: version.to_string(),
            })
    }

    /// Pull the descriptor mirror and ingest it if its head moved.
    ///
    /// A new commit is always dirty, even when no record changed: the commit itself is
    /// the new baseline.
    pub async fn pull_and_reconcile(&mut self, source: &dyn SourceControl) -> Result<bool> {
        log::info!("{}.pull_and_update pulling descriptor mirror", LABEL);
        let latest_commit = source.pull().await?;

        if self.snapshot.commit == latest_commit {
            log::info!("{}.pull_and_update already up to date", LABEL);
            return Ok(false);
        }

        let descriptor_dir = self.config.descriptor_dir();
        self.reconcile_all(&descriptor_dir).await?;
        self.snapshot.commit = latest_commit;

        log::info!("{}.pull_and_update updated to {}", LABEL, self.snapshot.commit);
        Ok(true)
    }

    /// Ingest every descriptor file in `descriptor_dir`, in lexical order.
    pub async fn reconcile_all(&mut self, descriptor_dir: &Path) -> Result<bool> {
        let files = descriptor_files(descriptor_dir).await?;
        let total = files.len();
        let mut dirty = false;

        for (i, file) in files.iter().enumerate() {
            let file_id = file_stem(file);
            log::debug!("{}.update {} {}", LABEL, progress(i, total), file_id);

            // every file is visited, a dirty version never short-circuits the pass
            let version_dirty = self.reconcile_version(&file_id, file).await?;
            dirty |= version_dirty;
        }

        // descriptors deleted upstream take their versions with them
        let present: HashSet<String> = files.iter().map(|file| file_stem(file)).collect();
        let before = self.snapshot.versions.len();
        self.snapshot.versions.retain(|file_id, _| present.contains(file_id));
        let removed = before - self.snapshot.versions.len();
        if removed > 0 {
            log::info!("{}.update removed {} deleted descriptor(s)", LABEL, removed);
            dirty = true;
        }

        self.warn_duplicate_versions();

        if dirty {
            sort_desc_by_key(&mut self.snapshot.versions, |_, version| {
                Ok::<_, SyncError>(version.release_time)
            })?;
            log::info!("{}.update updated", LABEL);
        } else {
            log::info!("{}.update unchanged", LABEL);
        }

        Ok(dirty)
    }

    fn warn_duplicate_versions(&self) {
        let current = self.current_versions();
        for version in self.versions() {
            if !current.iter().any(|chosen| chosen.file_id == version.file_id) {
                let used = current
                    .iter()
                    .find(|chosen| chosen.id == version.id)
                    .map(|chosen| chosen.file_id.as_str())
                    .unwrap_or_default();
                log::warn!(
                    "{}.update {} is also described by {}, using {}",
                    LABEL,
                    version.id,
                    version.file_id,
                    used
                );
            }
        }
    }

    /// Reconcile the version stored under `file_id` against its descriptor file,
    /// creating an empty entry first when the file is new.
    pub async fn reconcile_version(&mut self, file_id: &str, descriptor_file: &Path) -> Result<bool> {
        match self.snapshot.versions.get_mut(file_id) {
            Some(version) => version.reconcile(descriptor_file, &self.config).await,
            None => {
                let mut version = MetaVersion::empty();
                let dirty = version.reconcile(descriptor_file, &self.config).await?;
                self.snapshot.versions.insert(file_id.to_string(), version);
                Ok(dirty)
            }
        }
    }
}

impl MetaVersion {
    /// Ingest a descriptor file if its hash differs from the one last ingested.
    ///
    /// Either the whole descriptor applies or, on error, the version is left as it was.
    pub async fn reconcile(&mut self, descriptor_file: &Path, config: &SyncConfig) -> Result<bool> {
        let bytes = fs::read(descriptor_file).await?;
        let descriptor_sha1 = sha1_hex(&bytes);

        if self.sha1 == descriptor_sha1 {
            log::debug!("MetaVersion.update {} skipped", self.file_id);
            return Ok(false);
        }

        let descriptor: VersionDescriptor = serde_json::from_slice(&bytes)?;

        let mut next = self.clone();
        next.id = descriptor.id.clone();
        next.file_id = file_stem(descriptor_file);
        next.release_time = descriptor.release_time;
        next.sha1 = descriptor_sha1;

        for (name, download) in descriptor.downloads_where(|name| config.is_tracked_kind(name)) {
            let incoming = MetaRecord {
                identity: Identity {
                    version_id: next.id.clone(),
                    version_file_id: next.file_id.clone(),
                    version_release_time: next.release_time,
                    jar_key: name.clone(),
                },
                sha1: download.sha1.clone(),
                url: download.url.clone(),
            };

            match next.jars.get_mut(name) {
                Some(existing) => {
                    existing.reconcile(&incoming)?;
                }
                None => {
                    next.jars.insert(name.clone(), incoming);
                }
            }
        }

        next.jars.sort_keys();
        *self = next;

        log::info!("MetaVersion.update {} updated", self.file_id);
        Ok(true)
    }
}

async fn descriptor_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn supersedes(candidate: &MetaVersion, current: &MetaVersion) -> bool {
    let named_after_version = |v: &MetaVersion| v.file_id == v.id;
    (named_after_version(candidate), &candidate.file_id) > (named_after_version(current), &current.file_id)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{descriptor_json, test_config, write_descriptor, FakeSource};

    const T_1_20_1: &str = "2023-06-12T13:25:51+00:00";
    const T_1_19: &str = "2022-06-07T09:42:18+00:00";

    #[tokio::test]
    async fn test_reconcile_all_creates_sorted_records() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();

        write_descriptor(
            &descriptors,
            "1.19",
            &descriptor_json("1.19", T_1_19, &[("server", "s19", "u/s19"), ("client", "c19", "u/c19")]),
        )
        .await;
        write_descriptor(
            &descriptors,
            "1.20.1",
            &descriptor_json(
                "1.20.1",
                T_1_20_1,
                &[
                    ("windows_server", "w", "u/w"),
                    ("client_mappings", "m", "u/m"),
                    ("client", "c", "u/c"),
                ],
            ),
        )
        .await;

        let mut meta = MetaStore::new(config);
        assert!(meta.reconcile_all(&descriptors).await?);

        let order: Vec<&str> = meta.versions().map(|v| v.id.as_str()).collect();
        assert_eq!(order, vec!["1.20.1", "1.19"]);

        let keys: Vec<&str> = meta.version("1.20.1").unwrap().jars.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["client", "windows_server"]);

        let keys: Vec<&str> = meta.version("1.19").unwrap().jars.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["client", "server"]);

        assert_eq!(meta.release_time("1.19")?, T_1_19.parse::<DateTime<Utc>>().unwrap());
        assert!(matches!(meta.release_time("b1.7.3"), Err(SyncError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_unchanged_descriptor_is_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u/c")])).await;

        let mut meta = MetaStore::new(config);
        assert!(meta.reconcile_all(&descriptors).await?);
        let before = meta.snapshot().clone();

        assert!(!meta.reconcile_all(&descriptors).await?);
        assert_eq!(meta.snapshot(), &before);
        Ok(())
    }

    #[tokio::test]
    async fn test_changed_hash_updates_record_in_place() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "H1", "U1")])).await;

        let mut meta = MetaStore::new(config);
        meta.reconcile_all(&descriptors).await?;

        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "H2", "U2")])).await;
        assert!(meta.reconcile_all(&descriptors).await?);

        let record = &meta.version("1.20.1").unwrap().jars["client"];
        assert_eq!(record.sha1, "H2");
        assert_eq!(record.url, "U2");
        Ok(())
    }

    #[tokio::test]
    async fn test_descriptor_change_without_record_change_is_dirty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u")])).await;

        let mut meta = MetaStore::new(config);
        meta.reconcile_all(&descriptors).await?;

        // only an untracked download changes
        write_descriptor(
            &descriptors,
            "1.20.1",
            &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u"), ("client_mappings", "m", "u/m")]),
        )
        .await;
        assert!(meta.reconcile_all(&descriptors).await?);
        assert_eq!(meta.records().count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_release_time_change_is_identity_mismatch() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "H1", "U1")])).await;

        let mut meta = MetaStore::new(config);
        meta.reconcile_all(&descriptors).await?;
        let before = meta.snapshot().clone();

        write_descriptor(
            &descriptors,
            "1.20.1",
            &descriptor_json("1.20.1", "2023-06-13T00:00:00+00:00", &[("client", "H2", "U2")]),
        )
        .await;

        match meta.reconcile_all(&descriptors).await {
            Err(SyncError::IdentityMismatch { field, .. }) => assert_eq!(field, "version_release_time"),
            other => panic!("expected identity mismatch, got {other:?}"),
        }
        assert_eq!(meta.snapshot(), &before);
        Ok(())
    }

    #[tokio::test]
    async fn test_refiled_version_is_tracked_per_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.14_combat-212796", &descriptor_json("1.14_combat-212796", T_1_19, &[])).await;
        write_descriptor(&descriptors, "combat1", &descriptor_json("1.14_combat-212796", T_1_19, &[])).await;

        let mut meta = MetaStore::new(config);
        meta.reconcile_all(&descriptors).await?;

        assert_eq!(meta.versions().len(), 2);
        assert_eq!(meta.version("combat1").unwrap().id, "1.14_combat-212796");

        let current: Vec<&str> = meta.current_versions().iter().map(|v| v.file_id.as_str()).collect();
        assert_eq!(current, vec!["1.14_combat-212796"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_versions_resolve_to_last_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "combat-a", &descriptor_json("1.14_combat", T_1_19, &[("client", "j1", "u1")])).await;
        write_descriptor(&descriptors, "combat-b", &descriptor_json("1.14_combat", T_1_19, &[("client", "j2", "u2")])).await;

        let mut meta = MetaStore::new(config);
        meta.reconcile_all(&descriptors).await?;

        let current = meta.current_versions();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].file_id, "combat-b");
        assert_eq!(current[0].jars["client"].sha1, "j2");
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_descriptor_is_dropped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "combat-a", &descriptor_json("1.14_combat", T_1_19, &[("client", "j1", "u1")])).await;
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u")])).await;

        let mut meta = MetaStore::new(config);
        meta.reconcile_all(&descriptors).await?;

        fs::remove_file(descriptors.join("combat-a.json")).await?;
        assert!(meta.reconcile_all(&descriptors).await?);
        assert!(meta.version("combat-a").is_none());
        assert_eq!(meta.versions().len(), 1);

        assert!(!meta.reconcile_all(&descriptors).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_pull_short_circuits_on_same_commit() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u")])).await;

        let source = FakeSource::at("aaaa");
        let mut meta = MetaStore::new(config);
        assert!(meta.pull_and_reconcile(&source).await?);
        assert_eq!(meta.commit(), "aaaa");

        // descriptor edits are not looked at until the commit moves
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c2", "u")])).await;
        assert!(!meta.pull_and_reconcile(&source).await?);
        assert_eq!(meta.version("1.20.1").unwrap().jars["client"].sha1, "c");

        // a new commit is dirty even when no descriptor changed
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u")])).await;
        meta.reconcile_all(&descriptors).await?;
        source.advance("bbbb");
        assert!(meta.pull_and_reconcile(&source).await?);
        assert_eq!(meta.commit(), "bbbb");
        assert_eq!(source.pulls(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = test_config(dir.path());
        let descriptors = config.descriptor_dir();
        write_descriptor(&descriptors, "1.20.1", &descriptor_json("1.20.1", T_1_20_1, &[("client", "c", "u")])).await;

        let mut meta = MetaStore::new(config.clone());
        meta.pull_and_reconcile(&FakeSource::at("aaaa")).await?;
        meta.save().await?;
        let first = fs::read(config.meta_json_path()).await?;

        let loaded = MetaStore::load(config.clone()).await?;
        assert_eq!(loaded.snapshot(), meta.snapshot());
        loaded.save().await?;
        assert_eq!(fs::read(config.meta_json_path()).await?, first);
        Ok(())
    }
}
