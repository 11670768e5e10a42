//! Bundle jars (`META-INF/versions.list`) wrap the real server jar as an inner entry.

use crate::error::{Result, SyncError};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

pub const VERSIONS_LIST: &str = "META-INF/versions.list";
pub const VERSIONS_DIR: &str = "META-INF/versions";

/// Inner jar bytes if `bytes` is a bundle, `None` for a plain jar.
///
/// `path` only labels errors. A listing naming more than one version is rejected.
pub fn unwrap_bundle(path: &Path, bytes: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    if archive.index_for_name(VERSIONS_LIST).is_none() {
        return Ok(None);
    }

    let listing = String::from_utf8_lossy(&read_entry(&mut archive, VERSIONS_LIST)?).into_owned();
    let lines: Vec<&str> = listing.lines().filter(|line| !line.trim().is_empty()).collect();

    let line = match lines.as_slice() {
        [line] => *line,
        [] => {
            return Err(SyncError::InvalidBundle {
                path: path.to_path_buf(),
                reason: format!("{VERSIONS_LIST} is empty"),
            })
        }
        _ => {
            return Err(SyncError::MultiVersionBundle {
                path: path.to_path_buf(),
                count: lines.len(),
                listing: listing.clone(),
            })
        }
    };

    // <sha256>\t<version id>\t<path>
    let inner_path = line.rsplit('\t').next().unwrap_or(line).trim();
    let inner = read_entry(&mut archive, &format!("{VERSIONS_DIR}/{inner_path}"))?;
    Ok(Some(inner))
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive.by_name(name)?;
    let mut buffer = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut buffer)?;
    Ok(buffer)
}
