//! Publish-ready projection of the artifact store (`index.json`).

use crate::config::SyncConfig;
use crate::error::Result;
use crate::models::{Identity, Keyed};
use crate::store::{load_snapshot, save_snapshot, RecordMap};
use crate::sync::artifacts::{ArtifactRecord, ArtifactStore};
use crate::utils::progress::progress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LABEL: &str = "IndexStore";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(flatten)]
    pub identity: Identity,

    pub jar_sha1_meta: String,

    /// Repository-relative path of the mapping file
    pub path: String,

    pub url: String,
}

impl Keyed for IndexRecord {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl IndexRecord {
    pub fn from_artifact(artifact: &ArtifactRecord, config: &SyncConfig) -> Self {
        let path = artifact.map_rel_path(config);
        Self {
            identity: artifact.identity.clone(),
            jar_sha1_meta: artifact.jar_sha1_meta.clone(),
            url: config.public_url(&path),
            path,
        }
    }

    /// Mirror `artifact`, including a file id or release time that moved with a re-filed
    /// version.
    pub fn reconcile(&mut self, artifact: &ArtifactRecord, config: &SyncConfig) -> Result<bool> {
        self.identity.ensure_same_slot(&artifact.identity)?;

        let next = Self::from_artifact(artifact, config);
        if *self == next {
            return Ok(false);
        }

        *self = next;
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// When the index was last written
    pub timestamp: DateTime<Utc>,

    pub mappings: RecordMap<IndexRecord>,
}

pub struct IndexStore {
    config: Arc<SyncConfig>,
    snapshot: IndexSnapshot,
}

impl IndexStore {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self {
            config,
            snapshot: IndexSnapshot::default(),
        }
    }

    pub async fn load(config: Arc<SyncConfig>) -> Result<Self> {
        let snapshot = load_snapshot(&config.index_json_path(), LABEL).await?;
        Ok(Self { config, snapshot })
    }

    pub async fn save(&mut self) -> Result<()> {
        self.save_at(Utc::now()).await
    }

    /// Stamp `now` and write the snapshot
    pub async fn save_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.snapshot.timestamp = now;
        save_snapshot(&self.config.index_json_path(), &self.snapshot, LABEL).await
    }

    pub fn snapshot(&self) -> &IndexSnapshot {
        &self.snapshot
    }

    pub fn get(&self, version_id: &str, jar_key: &str) -> Option<&IndexRecord> {
        self.snapshot.mappings.get(version_id, jar_key)
    }

    pub fn records(&self) -> impl Iterator<Item = &IndexRecord> {
        self.snapshot.mappings.iter()
    }

    pub fn reconcile(&mut self, artifacts: &ArtifactStore) -> Result<bool> {
        let mut dirty = false;
        let total = artifacts.snapshot().versions.len();

        for (i, artifact) in artifacts.records().enumerate() {
            let version_id = artifact.version_id();
            let key = artifact.jar_key();
            log::debug!("{}.update {} {} {}", LABEL, progress(i, total), version_id, key);

            if self.snapshot.mappings.ensure_version(version_id) {
                dirty = true;
            }

            match self.snapshot.mappings.get(version_id, key).cloned() {
                None => {
                    self.snapshot
                        .mappings
                        .upsert(IndexRecord::from_artifact(artifact, &self.config));
                    log::info!("{}.update {} {} initialized", LABEL, version_id, key);
                    dirty = true;
                }
                Some(mut record) => {
                    if record.reconcile(artifact, &self.config)? {
                        self.snapshot.mappings.upsert(record);
                        log::info!("{}.update {} {} updated", LABEL, version_id, key);
                        dirty = true;
                    }
                }
            }
        }

        if dirty {
            self.snapshot
                .mappings
                .sort_versions_by_release_time(|version| artifacts.release_time(version))?;
            log::info!("{}.update updated", LABEL);
        } else {
            log::info!("{}.update unchanged", LABEL);
        }

        Ok(dirty)
    }
}
