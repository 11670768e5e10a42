use indexmap::IndexMap;
use std::hash::Hash;

/// Stable sort of an ordered map by a computed key, largest key first.
///
/// Keys are computed before anything moves, so a failing key function leaves the map
/// untouched. Entries with equal keys keep their relative order.
pub fn sort_desc_by_key<K, V, T, E, F>(map: &mut IndexMap<K, V>, mut key: F) -> Result<(), E>
where
    K: Hash + Eq,
    T: Ord,
    F: FnMut(&K, &V) -> Result<T, E>,
{
    let keys = map
        .iter()
        .map(|(k, v)| key(k, v))
        .collect::<Result<Vec<T>, E>>()?;

    let mut entries: Vec<(T, (K, V))> = keys.into_iter().zip(map.drain(..)).collect();
    entries.sort_by(|a, b| b.0.cmp(&a.0));
    map.extend(entries.into_iter().map(|(_, entry)| entry));
    Ok(())
}
