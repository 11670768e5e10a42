use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable identity shared by every record describing one (version, jar) pair.
///
/// `version_id` and `version_file_id` are distinct: a version can be re-published under
/// another descriptor file, and a file can be amended in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub version_id: String,
    pub version_file_id: String,
    pub version_release_time: DateTime<Utc>,
    pub jar_key: String,
}

impl Identity {
    /// Fails with [`SyncError::IdentityMismatch`] on the first differing field.
    pub fn ensure_same(&self, incoming: &Identity) -> Result<()> {
        let pairs = [
            ("version_id", &self.version_id, &incoming.version_id),
            ("version_file_id", &self.version_file_id, &incoming.version_file_id),
            ("jar_key", &self.jar_key, &incoming.jar_key),
        ];
        for (field, existing, new) in pairs {
            if existing != new {
                return Err(mismatch(field, existing, new));
            }
        }

        if self.version_release_time != incoming.version_release_time {
            return Err(mismatch(
                "version_release_time",
                &self.version_release_time.to_rfc3339(),
                &incoming.version_release_time.to_rfc3339(),
            ));
        }

        Ok(())
    }

    /// Fails unless both identities address the same (version id, jar key) slot.
    ///
    /// Downstream stages use this instead of [`Identity::ensure_same`]: a re-filed version
    /// keeps its slot while its file id and release time follow the newer descriptor.
    pub fn ensure_same_slot(&self, incoming: &Identity) -> Result<()> {
        if self.version_id != incoming.version_id {
            return Err(mismatch("version_id", &self.version_id, &incoming.version_id));
        }
        if self.jar_key != incoming.jar_key {
            return Err(mismatch("jar_key", &self.jar_key, &incoming.jar_key));
        }
        Ok(())
    }

    /// `{version_id}-{jar_key}.{extension}`
    pub fn filename(&self, extension: &str) -> String {
        format!("{}-{}.{}", self.version_id, self.jar_key, extension)
    }
}

fn mismatch(field: &'static str, existing: &str, incoming: &str) -> SyncError {
    SyncError::IdentityMismatch {
        field,
        existing: existing.to_string(),
        incoming: incoming.to_string(),
    }
}

/// Records addressable by the (version, jar key) pair of their identity.
pub trait Keyed {
    fn identity(&self) -> &Identity;

    fn version_id(&self) -> &str {
        &self.identity().version_id
    }

    fn jar_key(&self) -> &str {
        &self.identity().jar_key
    }
}
