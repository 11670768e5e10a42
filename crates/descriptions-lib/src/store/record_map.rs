//! Ordered `version id -> jar key -> record` map.
//!
//! Inner maps are kept sorted by jar key on every write. The outer order (newest release
//! first) depends on data the map does not own, so callers re-sort it with
//! [`RecordMap::sort_versions_by_release_time`] after a dirtying pass.

use crate::error::Result;
use crate::models::Keyed;
use crate::utils::ordering::sort_desc_by_key;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordMap<R> {
    versions: IndexMap<String, IndexMap<String, R>>,
}

impl<R> Default for RecordMap<R> {
    fn default() -> Self {
        Self {
            versions: IndexMap::new(),
        }
    }
}

impl<R: Keyed> RecordMap<R> {
    pub fn get(&self, version_id: &str, jar_key: &str) -> Option<&R> {
        self.versions.get(version_id)?.get(jar_key)
    }

    pub fn contains_version(&self, version_id: &str) -> bool {
        self.versions.contains_key(version_id)
    }

    /// Make sure a (possibly empty) entry exists for `version_id`. Returns true when created.
    pub fn ensure_version(&mut self, version_id: &str) -> bool {
        if self.versions.contains_key(version_id) {
            return false;
        }
        self.versions.insert(version_id.to_string(), IndexMap::new());
        true
    }

    /// Insert or replace a record, then restore key order within its version.
    pub fn upsert(&mut self, record: R) -> Option<R> {
        let jars = self
            .versions
            .entry(record.version_id().to_string())
            .or_default();
        let previous = jars.insert(record.jar_key().to_string(), record);
        jars.sort_keys();
        previous
    }

    /// All records, outer then inner order
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.versions.values().flat_map(|jars| jars.values())
    }

    pub fn version_ids(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn jars(&self, version_id: &str) -> Option<&IndexMap<String, R>> {
        self.versions.get(version_id)
    }

    pub fn len(&self) -> usize {
        self.versions.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release time recorded on any record of `version`, matched by version id or file id
    pub fn find_release_time(&self, version: &str) -> Option<DateTime<Utc>> {
        self.iter()
            .map(Keyed::identity)
            .find(|identity| identity.version_id == version || identity.version_file_id == version)
            .map(|identity| identity.version_release_time)
    }

    /// Order versions newest first, using `release_time` to look up each version's key.
    pub fn sort_versions_by_release_time<F>(&mut self, mut release_time: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<DateTime<Utc>>,
    {
        sort_desc_by_key(&mut self.versions, |version_id, _| release_time(version_id))
    }
}
