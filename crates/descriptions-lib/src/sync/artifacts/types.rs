use super::bundle::unwrap_bundle;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::models::{Identity, Keyed};
use crate::store::RecordMap;
use crate::sync::meta::MetaRecord;
use crate::tools::{ContentFetcher, Converter};
use crate::utils::fs::write_atomic;
use crate::utils::hash::{file_matches, file_sha1, sha1_hex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// A jar materialized on disk together with its mapping file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    #[serde(flatten)]
    pub identity: Identity,

    /// Upstream SHA-1 the files were last produced from
    pub jar_sha1_meta: String,

    /// SHA-1 of the canonical jar after unwrapping
    pub jar_sha1_local: String,

    pub jar_filename: String,
    pub map_filename: String,
}

impl Keyed for ArtifactRecord {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl ArtifactRecord {
    /// Create the record for a new meta record and materialize it right away.
    pub async fn from_meta(
        meta: &MetaRecord,
        config: &SyncConfig,
        fetcher: &dyn ContentFetcher,
        converter: &dyn Converter,
    ) -> Result<Self> {
        let mut record = Self {
            identity: meta.identity.clone(),
            jar_sha1_meta: String::new(),
            jar_sha1_local: String::new(),
            jar_filename: meta.filename("jar"),
            map_filename: meta.filename("tiny"),
        };
        record.reconcile(meta, config, fetcher, converter).await?;
        Ok(record)
    }

    /// Repository-relative path of the mapping file
    pub fn map_rel_path(&self, config: &SyncConfig) -> String {
        config.mapping_rel_path(&self.map_filename)
    }

    pub fn jar_path(&self, config: &SyncConfig) -> PathBuf {
        config.mappings_path().join(&self.jar_filename)
    }

    /// Where the original bundle is kept once its inner jar took the canonical name
    pub fn bundle_path(&self, config: &SyncConfig) -> PathBuf {
        self.jar_path(config).with_extension("bundle.jar")
    }

    pub fn map_path(&self, config: &SyncConfig) -> PathBuf {
        config.mappings_path().join(&self.map_filename)
    }

    /// Re-materialize when the upstream hash moved. Fields only change once every
    /// step succeeded.
    ///
    /// A re-filed version only moves the file id and release time; that is recorded
    /// without touching the files.
    pub async fn reconcile(
        &mut self,
        meta: &MetaRecord,
        config: &SyncConfig,
        fetcher: &dyn ContentFetcher,
        converter: &dyn Converter,
    ) -> Result<bool> {
        self.identity.ensure_same_slot(&meta.identity)?;

        if meta.sha1 == self.jar_sha1_meta {
            if self.identity == meta.identity {
                return Ok(false);
            }
            log::info!(
                "ArtifactRecord.update {} re-filed from {} to {}",
                self.jar_filename,
                self.identity.version_file_id,
                meta.identity.version_file_id
            );
            self.identity = meta.identity.clone();
            return Ok(true);
        }

        let jar_path = self.jar_path(config);
        let map_path = self.map_path(config);

        self.stage_jar(meta, config, fetcher).await?;

        log::info!("ArtifactRecord.update {:?} convert", jar_path);
        converter
            .convert(&jar_path, &map_path, &config.mapping_format)
            .await?;

        let local = file_sha1(&jar_path).await?.ok_or_else(|| {
            SyncError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{:?} vanished after conversion", jar_path),
            ))
        })?;

        self.identity = meta.identity.clone();
        self.jar_sha1_meta = meta.sha1.clone();
        self.jar_sha1_local = local;

        log::info!("ArtifactRecord.update {:?} done", jar_path);
        Ok(true)
    }

    /// Leave the canonical jar path holding the (unwrapped) jar for `meta.sha1`,
    /// downloading only when neither local file already carries that content.
    async fn stage_jar(
        &self,
        meta: &MetaRecord,
        config: &SyncConfig,
        fetcher: &dyn ContentFetcher,
    ) -> Result<()> {
        let jar_path = self.jar_path(config);
        let bundle_path = self.bundle_path(config);

        if file_matches(&jar_path, &meta.sha1).await? {
            // upstream bytes already on the canonical path, possibly still wrapped
            let bytes = fs::read(&jar_path).await?;
            if let Some(inner) = unwrap_bundle(&jar_path, &bytes)? {
                log::info!("ArtifactRecord.update {:?} extract bundle", jar_path);
                fs::rename(&jar_path, &bundle_path).await?;
                write_atomic(&jar_path, &inner).await?;
            }
            return Ok(());
        }

        if file_matches(&bundle_path, &meta.sha1).await? {
            // unwrapped on an earlier run; re-derive the canonical jar in case that run
            // stopped between moving the bundle aside and writing the inner jar
            let bytes = fs::read(&bundle_path).await?;
            let inner = unwrap_bundle(&bundle_path, &bytes)?.unwrap_or(bytes);
            if !file_matches(&jar_path, &sha1_hex(&inner)).await? {
                log::info!("ArtifactRecord.update {:?} restore from bundle", jar_path);
                write_atomic(&jar_path, &inner).await?;
            }
            return Ok(());
        }

        log::info!("ArtifactRecord.update {:?} download", jar_path);
        let bytes = fetcher.fetch(&meta.url).await?;

        let actual = sha1_hex(&bytes);
        if !actual.eq_ignore_ascii_case(&meta.sha1) {
            return Err(SyncError::ChecksumMismatch {
                url: meta.url.clone(),
                expected: meta.sha1.clone(),
                actual,
            });
        }

        // inspect before writing so a rejected bundle leaves nothing behind
        match unwrap_bundle(&jar_path, &bytes)? {
            Some(inner) => {
                log::info!("ArtifactRecord.update {:?} extract bundle", jar_path);
                write_atomic(&bundle_path, &bytes).await?;
                write_atomic(&jar_path, &inner).await?;
            }
            None => write_atomic(&jar_path, &bytes).await?,
        }

        Ok(())
    }
}

/// Persisted form of the artifact store (`jars.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSnapshot {
    pub versions: RecordMap<ArtifactRecord>,
}
