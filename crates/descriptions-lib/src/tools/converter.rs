use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::utils::process::{stderr_text, ToolCommandExt};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Derives a mapping file from a jar.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `input` into `output` in the given target format.
    /// Any failure of the tool is reported as [`SyncError::Conversion`].
    async fn convert(&self, input: &Path, output: &Path, format: &str) -> Result<()>;
}

/// Runs `java -jar mapping-io-cli.jar convert <input> <output> <format>`.
pub struct MappingIoConverter {
    java: String,
    tool_jar: PathBuf,
}

impl MappingIoConverter {
    pub fn new(java: impl Into<String>, tool_jar: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            tool_jar: tool_jar.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.java.clone(), config.mapping_tool_path())
    }
}

#[async_trait]
impl Converter for MappingIoConverter {
    async fn convert(&self, input: &Path, output: &Path, format: &str) -> Result<()> {
        let mut command = Command::new(&self.java);
        command
            .arg("-jar")
            .arg(&self.tool_jar)
            .arg("convert")
            .arg(input)
            .arg(output)
            .arg(format)
            .suppress_console()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("Executing: {:?}", command);
        let result = command.output().await?;

        if !result.status.success() {
            let stderr = stderr_text(&result);
            log::error!("mapping-io failed:");
            log::error!("  input: {:?}", input);
            log::error!("  stdout: {}", String::from_utf8_lossy(&result.stdout));
            log::error!("  stderr: {}", stderr);
            return Err(SyncError::Conversion {
                input: input.to_path_buf(),
                code: result.status.code(),
                stderr,
            });
        }

        Ok(())
    }
}
