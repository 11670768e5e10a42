pub mod record_map;
pub mod snapshot;

pub use record_map::RecordMap;
pub use snapshot::{load_snapshot, save_snapshot};
