use crate::config::{CommitIdentity, SyncConfig};
use crate::error::{Result, SyncError};
use crate::utils::process::{stderr_text, ToolCommandExt};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Upstream of the descriptor mirror.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Fast-forward the local mirror and return the resulting head commit.
    async fn pull(&self) -> Result<String>;
}

/// Publishes the results of a run.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Commit and push every change in the working tree.
    /// Returns false when there was nothing to commit.
    async fn publish(&self, message: &str) -> Result<bool>;
}

/// A git working tree driven through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
    remote: String,
    branch: String,
}

impl GitRepo {
    pub fn new(dir: impl Into<PathBuf>, remote: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    /// The descriptor mirror described by `config`
    pub fn descriptor_mirror(config: &SyncConfig) -> Self {
        Self::new(
            config.descriptor_repo_dir(),
            config.upstream_remote.clone(),
            config.upstream_branch.clone(),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Run `git -C <dir> <args>` and return trimmed stdout
    pub async fn git(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(&self.dir)
            .args(args)
            .suppress_console()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("Executing: {:?}", command);
        let output = command.output().await?;

        if !output.status.success() {
            return Err(SyncError::SourceControl {
                command: args.join(" "),
                code: output.status.code(),
                stderr: stderr_text(&output),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn head(&self) -> Result<String> {
        self.git(&["rev-parse", "HEAD"]).await
    }

    pub async fn has_changes(&self) -> Result<bool> {
        Ok(!self.git(&["status", "--porcelain"]).await?.is_empty())
    }
}

#[async_trait]
impl SourceControl for GitRepo {
    async fn pull(&self) -> Result<String> {
        log::info!("Pulling {} {} in {:?}", self.remote, self.branch, self.dir);
        self.git(&["pull", "--ff-only", &self.remote, &self.branch]).await?;
        self.head().await
    }
}

/// Commits as a fixed bot identity and pushes to the default upstream.
pub struct GitPublisher {
    repo: GitRepo,
    identity: CommitIdentity,
}

impl GitPublisher {
    pub fn new(repo: GitRepo, identity: CommitIdentity) -> Self {
        Self { repo, identity }
    }

    /// The results repository described by `config`
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            GitRepo::new(config.root_dir.clone(), config.upstream_remote.clone(), config.upstream_branch.clone()),
            config.commit_identity.clone(),
        )
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(&self, message: &str) -> Result<bool> {
        if !self.repo.has_changes().await? {
            log::info!("Nothing to publish in {:?}", self.repo.dir());
            return Ok(false);
        }

        let name = format!("user.name={}", self.identity.name);
        let email = format!("user.email={}", self.identity.email);
        let author = format!("{} <{}>", self.identity.name, self.identity.email);

        self.repo.git(&["add", "--all"]).await?;
        self.repo
            .git(&["-c", &name, "-c", &email, "commit", "--author", &author, "-m", message])
            .await?;
        self.repo.git(&["push"]).await?;

        log::info!("Published {:?}", message);
        Ok(true)
    }
}
