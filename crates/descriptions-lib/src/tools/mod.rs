//! External collaborators of the pipeline: HTTP, the mapping tool and git.
//! Each sits behind a trait so tests can substitute in-memory fakes.

pub mod converter;
pub mod fetcher;
pub mod git;

pub use converter::{Converter, MappingIoConverter};
pub use fetcher::{ContentFetcher, HttpFetcher};
pub use git::{GitPublisher, GitRepo, Publisher, SourceControl};
