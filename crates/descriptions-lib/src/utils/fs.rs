use std::io;
use std::path::Path;
use tokio::fs;

/// Write `bytes` to `path` through a sibling `.part` file so a failed write never
/// leaves a truncated file at the destination.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp_name = format!(
        "{}.part",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
    );
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, bytes).await?;
    fs::rename(&tmp_path, path).await
}
