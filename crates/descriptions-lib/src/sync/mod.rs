//! The three sync stages, each persisted as its own snapshot.

pub mod artifacts;
pub mod index;
pub mod meta;

pub use artifacts::ArtifactStore;
pub use index::IndexStore;
pub use meta::MetaStore;
