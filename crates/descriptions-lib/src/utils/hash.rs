use sha1::{Digest, Sha1};
use std::io;
use std::path::Path;

/// Lowercase hex SHA-1 of a byte slice
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// SHA-1 of a file, or `None` when the file does not exist
pub async fn file_sha1(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(sha1_hex(&bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Whether the file at `path` exists and hashes to `expected`
pub async fn file_matches(path: &Path, expected: &str) -> io::Result<bool> {
    Ok(file_sha1(path)
        .await?
        .is_some_and(|computed| computed.eq_ignore_ascii_case(expected)))
}
