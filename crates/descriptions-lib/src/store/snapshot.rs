use crate::error::Result;
use crate::utils::fs::write_atomic;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

/// Load a snapshot from disk, starting from an empty one when the file does not exist yet
pub async fn load_snapshot<T>(path: &Path, label: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !fs::try_exists(path).await? {
        log::info!("{}.load {:?} missing, starting empty", label, path);
        return Ok(T::default());
    }

    log::info!("{}.load {:?}", label, path);
    let contents = fs::read(path).await?;
    Ok(serde_json::from_slice(&contents)?)
}

/// Save a snapshot as pretty JSON.
///
/// Ordered maps serialize in stored order, so an unchanged snapshot re-saves to the same bytes.
pub async fn save_snapshot<T: Serialize>(path: &Path, snapshot: &T, label: &str) -> Result<()> {
    log::info!("{}.save {:?}", label, path);
    let json = serde_json::to_vec_pretty(snapshot)?;
    write_atomic(path, &json).await?;
    Ok(())
}
