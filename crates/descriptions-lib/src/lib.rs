extern crate self as descriptions_lib;

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod sync;
pub mod tools;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use pipeline::{Pipeline, PipelineReport};
pub use sync::{ArtifactStore, IndexStore, MetaStore};
