//! Materialization of jars and their mapping files.
//!
//! Network and subprocess work only happens for records whose upstream hash moved,
//! which is what keeps a no-op run cheap.

pub mod bundle;
pub mod types;

pub use types::*;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::store::{load_snapshot, save_snapshot};
use crate::sync::meta::MetaStore;
use crate::tools::{ContentFetcher, Converter};
use crate::utils::progress::progress;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

const LABEL: &str = "ArtifactStore";

pub struct ArtifactStore {
    config: Arc<SyncConfig>,
    snapshot: ArtifactSnapshot,
}

impl ArtifactStore {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self::with_snapshot(config, ArtifactSnapshot::default())
    }

    pub fn with_snapshot(config: Arc<SyncConfig>, snapshot: ArtifactSnapshot) -> Self {
        Self { config, snapshot }
    }

    pub async fn load(config: Arc<SyncConfig>) -> Result<Self> {
        let snapshot = load_snapshot(&config.jars_json_path(), LABEL).await?;
        Ok(Self::with_snapshot(config, snapshot))
    }

    pub async fn save(&self) -> Result<()> {
        save_snapshot(&self.config.jars_json_path(), &self.snapshot, LABEL).await
    }

    pub fn snapshot(&self) -> &ArtifactSnapshot {
        &self.snapshot
    }

    pub fn get(&self, version_id: &str, jar_key: &str) -> Option<&ArtifactRecord> {
        self.snapshot.versions.get(version_id, jar_key)
    }

    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.snapshot.versions.iter()
    }

    pub fn release_time(&self, version: &str) -> Result<DateTime<Utc>> {
        self.snapshot
            .versions
            .find_release_time(version)
            .ok_or_else(|| SyncError::NotFound {
                version: version.to_string(),
            })
    }

    /// Bring every jar declared in `meta` up to date.
    ///
    /// Versions are walked oldest first, one descriptor per version id; new records are
    /// always materialized, existing ones only when their upstream hash moved.
    pub async fn reconcile_all(
        &mut self,
        meta: &MetaStore,
        fetcher: &dyn ContentFetcher,
        converter: &dyn Converter,
    ) -> Result<bool> {
        let mut dirty = false;
        let versions = meta.current_versions();
        let total = versions.len();

        for (i, version) in versions.into_iter().rev().enumerate() {
            let prefix = format!("{}.update {} {}", LABEL, progress(i, total), version.id);
            log::debug!("{}", prefix);

            if self.snapshot.versions.ensure_version(&version.id) {
                dirty = true;
            }

            for (key, meta_record) in &version.jars {
                match self.snapshot.versions.get(&version.id, key).cloned() {
                    None => {
                        let record =
                            ArtifactRecord::from_meta(meta_record, &self.config, fetcher, converter)
                                .await?;
                        self.snapshot.versions.upsert(record);
                        log::info!("{} {} initialized", prefix, key);
                        dirty = true;
                    }
                    Some(mut record) => {
                        if record
                            .reconcile(meta_record, &self.config, fetcher, converter)
                            .await?
                        {
                            self.snapshot.versions.upsert(record);
                            log::info!("{} {} updated", prefix, key);
                            dirty = true;
                        } else {
                            log::debug!("{} {} skipped", prefix, key);
                        }
                    }
                }
            }
        }

        if dirty {
            // versions that left meta keep the release time they were recorded with
            let recorded: HashMap<String, DateTime<Utc>> = self
                .records()
                .map(|r| (r.identity.version_id.clone(), r.identity.version_release_time))
                .collect();
            self.snapshot.versions.sort_versions_by_release_time(|version| {
                meta.release_time(version)
                    .or_else(|e| recorded.get(version).copied().ok_or(e))
            })?;
            log::info!("{}.update updated", LABEL);
        } else {
            log::info!("{}.update unchanged", LABEL);
        }

        Ok(dirty)
    }
}
