//! Centralized sync settings.
//! Defaults describe the layout of the published repository; every value can be
//! overridden through `JAR_DESCRIPTIONS_*` environment variables (or a `.env` file).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://jackassmc.github.io/minecraft-jars-java-descriptions";
pub const DEFAULT_ARTIFACT_KINDS: [&str; 3] = ["client", "server", "windows_server"];
pub const DEFAULT_MAPPING_TOOL_JAR: &str = "mapping-io-cli-0.3.0-all.jar";
pub const MAPPING_FORMAT: &str = "TINY_2";

pub const CONNECT_TIMEOUT_SECS: u64 = 30;
// Bounds the whole download, body included; server bundles run to tens of megabytes.
pub const REQUEST_TIMEOUT_SECS: u64 = 900;

const ENV_PREFIX: &str = "JAR_DESCRIPTIONS_";

/// Author and committer used when publishing results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "github-actions[bot]".to_string(),
            email: "github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

/// Sync configuration shared by every store.
///
/// Relative paths are resolved against `root_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Repository root holding the snapshots and the mappings directory
    pub root_dir: PathBuf,

    /// Git checkout mirroring the upstream version descriptors
    pub descriptor_repo: PathBuf,

    /// Directory of descriptor files inside `descriptor_repo`
    pub descriptor_subdir: PathBuf,

    /// Directory (relative to the root, `/` separated) receiving jars and mappings
    pub mappings_dir: String,

    pub meta_json: PathBuf,
    pub jars_json: PathBuf,
    pub index_json: PathBuf,

    /// Public URL the repository root is served from
    pub base_url: String,

    /// Download entries taken from each descriptor; anything else is ignored
    pub artifact_kinds: Vec<String>,

    pub java: String,
    pub mapping_tool_jar: PathBuf,
    pub mapping_format: String,

    pub upstream_remote: String,
    pub upstream_branch: String,

    /// Time allowed to establish a connection
    pub connect_timeout_secs: u64,

    /// Time allowed for a whole request, body included
    pub request_timeout_secs: u64,

    pub commit_identity: CommitIdentity,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            descriptor_repo: PathBuf::from("multimc-meta-upstream"),
            descriptor_subdir: PathBuf::from("mojang/versions"),
            mappings_dir: "mappings".to_string(),
            meta_json: PathBuf::from("meta.json"),
            jars_json: PathBuf::from("jars.json"),
            index_json: PathBuf::from("index.json"),
            base_url: DEFAULT_BASE_URL.to_string(),
            artifact_kinds: DEFAULT_ARTIFACT_KINDS.iter().map(|k| k.to_string()).collect(),
            java: "java".to_string(),
            mapping_tool_jar: PathBuf::from(DEFAULT_MAPPING_TOOL_JAR),
            mapping_format: MAPPING_FORMAT.to_string(),
            upstream_remote: "origin".to_string(),
            upstream_branch: "master".to_string(),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            commit_identity: CommitIdentity::default(),
        }
    }
}

impl SyncConfig {
    /// Default layout rooted at `root_dir`.
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `JAR_DESCRIPTIONS_*` variables from the environment or `.env`.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {:?}", path);
        }
        Self::default().with_overrides(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Apply overrides from a lookup function keyed by the unprefixed variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("ROOT") {
            self.root_dir = v.into();
        }
        if let Some(v) = lookup("DESCRIPTOR_REPO") {
            self.descriptor_repo = v.into();
        }
        if let Some(v) = lookup("DESCRIPTOR_SUBDIR") {
            self.descriptor_subdir = v.into();
        }
        if let Some(v) = lookup("MAPPINGS_DIR") {
            self.mappings_dir = v.trim_matches('/').to_string();
        }
        if let Some(v) = lookup("BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("ARTIFACT_KINDS") {
            self.artifact_kinds = v
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("JAVA") {
            self.java = v;
        }
        if let Some(v) = lookup("MAPPING_TOOL_JAR") {
            self.mapping_tool_jar = v.into();
        }
        if let Some(v) = lookup("UPSTREAM_REMOTE") {
            self.upstream_remote = v;
        }
        if let Some(v) = lookup("UPSTREAM_BRANCH") {
            self.upstream_branch = v;
        }
        if let Some(v) = lookup("CONNECT_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.connect_timeout_secs = secs,
                Err(e) => log::warn!("Ignoring invalid CONNECT_TIMEOUT_SECS {:?}: {}", v, e),
            }
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(e) => log::warn!("Ignoring invalid REQUEST_TIMEOUT_SECS {:?}: {}", v, e),
            }
        }
        self
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root_dir.join(path)
    }

    pub fn descriptor_repo_dir(&self) -> PathBuf {
        self.resolve(&self.descriptor_repo)
    }

    pub fn descriptor_dir(&self) -> PathBuf {
        self.descriptor_repo_dir().join(&self.descriptor_subdir)
    }

    pub fn mappings_path(&self) -> PathBuf {
        self.root_dir.join(&self.mappings_dir)
    }

    pub fn meta_json_path(&self) -> PathBuf {
        self.resolve(&self.meta_json)
    }

    pub fn jars_json_path(&self) -> PathBuf {
        self.resolve(&self.jars_json)
    }

    pub fn index_json_path(&self) -> PathBuf {
        self.resolve(&self.index_json)
    }

    pub fn mapping_tool_path(&self) -> PathBuf {
        self.resolve(&self.mapping_tool_jar)
    }

    /// Repository-relative, `/` separated path of a file in the mappings directory
    pub fn mapping_rel_path(&self, filename: &str) -> String {
        if self.mappings_dir.is_empty() {
            filename.to_string()
        } else {
            format!("{}/{}", self.mappings_dir, filename)
        }
    }

    /// Public URL of a repository-relative path
    pub fn public_url(&self, rel_path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), rel_path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_tracked_kind(&self, kind: &str) -> bool {
        self.artifact_kinds.iter().any(|k| k == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_paths() {
        let config = SyncConfig::with_root("/srv/descriptions");
        assert_eq!(
            config.descriptor_dir(),
            PathBuf::from("/srv/descriptions/multimc-meta-upstream/mojang/versions")
        );
        assert_eq!(config.mapping_rel_path("1.20.1-client.tiny"), "mappings/1.20.1-client.tiny");
        assert_eq!(
            config.public_url("mappings/1.20.1-client.tiny"),
            format!("{}/mappings/1.20.1-client.tiny", DEFAULT_BASE_URL)
        );
        assert!(config.is_tracked_kind("windows_server"));
        assert!(!config.is_tracked_kind("client_mappings"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(CONNECT_TIMEOUT_SECS));
        assert!(config.request_timeout() > config.connect_timeout());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BASE_URL", "http://localhost:8000/"),
            ("ARTIFACT_KINDS", "client, server,"),
            ("MAPPINGS_DIR", "/out/"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
            ("CONNECT_TIMEOUT_SECS", "5"),
        ]);
        let config = SyncConfig::default().with_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.artifact_kinds, vec!["client", "server"]);
        assert_eq!(config.public_url("out/a.tiny"), "http://localhost:8000/out/a.tiny");
        assert_eq!(config.mapping_rel_path("a.tiny"), "out/a.tiny");
        assert_eq!(config.request_timeout_secs, REQUEST_TIMEOUT_SECS);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
    }
}
