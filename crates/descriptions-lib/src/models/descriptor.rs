// Mojang version JSON as mirrored under `mojang/versions/<file id>.json`.
// Only the fields the sync reads are modelled; everything else is ignored.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    pub id: String,

    pub release_time: DateTime<Utc>,

    /// Download entries keyed by name (client, server, client_mappings, ...)
    #[serde(default)]
    pub downloads: IndexMap<String, Download>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub sha1: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    pub url: String,
}

impl VersionDescriptor {
    /// Downloads whose name passes `keep`, sorted by name
    pub fn downloads_where<'a>(
        &'a self,
        keep: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = (&'a String, &'a Download)> + 'a {
        let mut selected: Vec<_> = self
            .downloads
            .iter()
            .filter(|(name, _)| keep(name.as_str()))
            .collect();
        selected.sort_by(|a, b| a.0.cmp(b.0));
        selected.into_iter()
    }
}
