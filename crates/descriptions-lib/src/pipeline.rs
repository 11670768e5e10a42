//! Stage orchestration.
//!
//! Every stage reads the persisted state of the one before it, so a crash mid-run never
//! lets a half-updated upstream store look consistent.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::sync::{ArtifactStore, IndexStore, MetaStore};
use crate::tools::{
    ContentFetcher, Converter, GitRepo, HttpFetcher, MappingIoConverter, Publisher, SourceControl,
};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::sync::Arc;

/// What a single invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Every stage, short-circuiting on the first unchanged one
    All,
    Meta,
    Artifacts,
    Index,
}

/// Which stages reported changes during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub meta: bool,
    pub artifacts: bool,
    pub index: bool,
}

impl PipelineReport {
    pub fn changed(&self) -> bool {
        self.meta || self.artifacts || self.index
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |dirty: bool| if dirty { "updated" } else { "unchanged" };
        write!(
            f,
            "meta {}, jars {}, index {}",
            state(self.meta),
            state(self.artifacts),
            state(self.index)
        )
    }
}

pub struct Pipeline {
    config: Arc<SyncConfig>,
    source: Box<dyn SourceControl>,
    fetcher: Box<dyn ContentFetcher>,
    converter: Box<dyn Converter>,
}

impl Pipeline {
    pub fn new(
        config: Arc<SyncConfig>,
        source: Box<dyn SourceControl>,
        fetcher: Box<dyn ContentFetcher>,
        converter: Box<dyn Converter>,
    ) -> Self {
        Self {
            config,
            source,
            fetcher,
            converter,
        }
    }

    /// Production collaborators: git mirror, reqwest and the mapping-io CLI.
    pub fn from_config(config: Arc<SyncConfig>) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.connect_timeout(), config.request_timeout())?;
        Ok(Self::new(
            config.clone(),
            Box::new(GitRepo::descriptor_mirror(&config)),
            Box::new(fetcher),
            Box::new(MappingIoConverter::from_config(&config)),
        ))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub async fn update_meta(&self) -> Result<bool> {
        let mut meta = MetaStore::load(self.config.clone()).await?;
        let dirty = meta.pull_and_reconcile(self.source.as_ref()).await?;
        if dirty {
            meta.save().await?;
        }
        Ok(dirty)
    }

    pub async fn update_artifacts(&self) -> Result<bool> {
        let meta = MetaStore::load(self.config.clone()).await?;
        let mut artifacts = ArtifactStore::load(self.config.clone()).await?;
        let dirty = artifacts
            .reconcile_all(&meta, self.fetcher.as_ref(), self.converter.as_ref())
            .await?;
        if dirty {
            artifacts.save().await?;
        }
        Ok(dirty)
    }

    pub async fn update_index(&self) -> Result<bool> {
        let artifacts = ArtifactStore::load(self.config.clone()).await?;
        let mut index = IndexStore::load(self.config.clone()).await?;
        let dirty = index.reconcile(&artifacts)?;
        if dirty {
            index.save().await?;
        }
        Ok(dirty)
    }

    /// Run the stages in order, stopping at the first one that reports no change.
    pub async fn run(&self) -> Result<PipelineReport> {
        let mut report = PipelineReport::default();

        report.meta = self.update_meta().await?;
        if !report.meta {
            log::info!("Pipeline finished: {}", report);
            return Ok(report);
        }

        report.artifacts = self.update_artifacts().await?;
        if !report.artifacts {
            log::info!("Pipeline finished: {}", report);
            return Ok(report);
        }

        report.index = self.update_index().await?;
        log::info!("Pipeline finished: {}", report);
        Ok(report)
    }

    /// Run `stage`, then hand the working tree to `publisher` if one is given.
    ///
    /// Publishing does not depend on what this run changed; the publisher skips a clean
    /// tree. Returns whether this run changed anything.
    pub async fn execute(&self, stage: Stage, publisher: Option<&dyn Publisher>) -> Result<bool> {
        let changed = match stage {
            Stage::All => self.run().await?.changed(),
            Stage::Meta => self.update_meta().await?,
            Stage::Artifacts => self.update_artifacts().await?,
            Stage::Index => self.update_index().await?,
        };

        if let Some(publisher) = publisher {
            if !publish(publisher, Utc::now()).await? {
                log::info!("Nothing to publish");
            }
        }

        Ok(changed)
    }
}

/// ISO-8601 UTC timestamp with seconds precision, e.g. `2024-05-01T12:00:00+00:00`
pub fn commit_message(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub async fn publish(publisher: &dyn Publisher, now: DateTime<Utc>) -> Result<bool> {
    publisher.publish(&commit_message(now)).await
}
