//! Pulling snapshots into the local store.

pub mod normalize;
pub mod repository;

pub use normalize::{normalize_authors, normalize_books};
pub use repository::{CatalogRepository, SyncReport};
