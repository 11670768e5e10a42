use crate::error::Result;
use crate::models::{Identity, Keyed};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Upstream facts about one jar of one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    #[serde(flatten)]
    pub identity: Identity,

    /// Upstream SHA-1 of the jar
    pub sha1: String,

    pub url: String,
}

impl Keyed for MetaRecord {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl MetaRecord {
    /// Take `sha1` and `url` from `incoming`. Identity must match, otherwise nothing changes.
    pub fn reconcile(&mut self, incoming: &MetaRecord) -> Result<bool> {
        self.identity.ensure_same(&incoming.identity)?;

        let mut dirty = false;

        if self.sha1 != incoming.sha1 {
            self.sha1 = incoming.sha1.clone();
            dirty = true;
        }

        if self.url != incoming.url {
            self.url = incoming.url.clone();
            dirty = true;
        }

        Ok(dirty)
    }

    pub fn filename(&self, extension: &str) -> String {
        self.identity.filename(extension)
    }
}

/// One descriptor file and the jars it declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaVersion {
    pub id: String,

    /// Descriptor file stem
    pub file_id: String,

    pub release_time: DateTime<Utc>,

    /// SHA-1 of the descriptor file last ingested
    pub sha1: String,

    /// Tracked jars keyed by download name, sorted by key
    pub jars: IndexMap<String, MetaRecord>,
}

impl MetaVersion {
    pub fn empty() -> Self {
        Self {
            id: String::new(),
            file_id: String::new(),
            release_time: DateTime::<Utc>::default(),
            sha1: String::new(),
            jars: IndexMap::new(),
        }
    }
}

/// Persisted form of the meta store (`meta.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaSnapshot {
    /// Head commit of the descriptor mirror last ingested
    pub commit: String,

    /// Versions keyed by descriptor file id, newest release first
    pub versions: IndexMap<String, MetaVersion>,
}
