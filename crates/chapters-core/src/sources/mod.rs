//! Snapshot sources the sync orchestrator pulls from.

pub mod bundled;
pub mod remote;

pub use bundled::BundledSource;
pub use remote::RemoteSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AuthorRecord, BookRecord, Provenance};

/// Produces one full snapshot per call. Implementations do not retry.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    fn provenance(&self) -> Provenance;

    async fn fetch_books(&self) -> Result<Vec<BookRecord>>;

    async fn fetch_authors(&self) -> Result<Vec<AuthorRecord>>;
}
