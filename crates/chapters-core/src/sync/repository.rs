use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::normalize::{normalize_authors, normalize_books};
use crate::config::SyncConfig;
use crate::connectivity::{ConnectivityProbe, TcpProbe};
use crate::error::Result;
use crate::models::{Author, AuthorFilter, Book, BookFilter, EntityKind, Provenance};
use crate::sources::{BundledSource, CatalogSource, RemoteSource};
use crate::storage::{CatalogStore, Subscription};

/// Outcome of one successful sync. `provenance` is informational only and
/// is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub kind: EntityKind,
    pub provenance: Provenance,
    pub count: usize,
}

/// Sync orchestrator and query facade over the local store.
///
/// Reads always come from the store. Syncs pull a snapshot from the remote
/// when the probe says it is reachable, fall back to the bundled snapshot on
/// a network or remote parse failure, and upsert whatever they got.
pub struct CatalogRepository {
    store: Arc<CatalogStore>,
    remote: Arc<dyn CatalogSource>,
    fallback: Arc<dyn CatalogSource>,
    probe: Arc<dyn ConnectivityProbe>,
}

impl CatalogRepository {
    pub fn new(
        store: Arc<CatalogStore>,
        remote: Arc<dyn CatalogSource>,
        fallback: Arc<dyn CatalogSource>,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            store,
            remote,
            fallback,
            probe,
        }
    }

    /// Wire up the production sources and probe from config.
    pub fn from_config(store: Arc<CatalogStore>, config: &SyncConfig) -> Result<Self> {
        Ok(Self::new(
            store,
            Arc::new(RemoteSource::new(config)?),
            Arc::new(BundledSource::from_config(config)),
            Arc::new(TcpProbe::from_config(config)),
        ))
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    // ─── Sync ──────────────────────────────────────────────

    pub async fn sync(&self, kind: EntityKind) -> Result<SyncReport> {
        if self.probe.is_reachable().await {
            match self.pull(self.remote.as_ref(), kind).await {
                Ok(report) => return Ok(report),
                Err(e) if e.triggers_fallback() => {
                    warn!(%kind, error = %e, "remote sync failed, using bundled snapshot");
                }
                Err(e) => return Err(e),
            }
        } else {
            info!(%kind, "remote unreachable, using bundled snapshot");
        }

        self.pull(self.fallback.as_ref(), kind).await
    }

    pub async fn sync_books(&self) -> Result<SyncReport> {
        self.sync(EntityKind::Books).await
    }

    pub async fn sync_authors(&self) -> Result<SyncReport> {
        self.sync(EntityKind::Authors).await
    }

    /// Sync every kind. A failure on one kind does not stop the others.
    pub async fn sync_all(&self) -> Vec<(EntityKind, Result<SyncReport>)> {
        let mut results = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let result = self.sync(kind).await;
            if let Err(e) = &result {
                warn!(%kind, error = %e, "sync failed");
            }
            results.push((kind, result));
        }
        results
    }

    async fn pull(&self, source: &dyn CatalogSource, kind: EntityKind) -> Result<SyncReport> {
        let count = match kind {
            EntityKind::Books => {
                let books = normalize_books(source.fetch_books().await?);
                self.store.upsert_books(&books)?
            }
            EntityKind::Authors => {
                let authors = normalize_authors(source.fetch_authors().await?);
                self.store.upsert_authors(&authors)?
            }
        };
        let provenance = source.provenance();
        info!(%kind, %provenance, count, "sync complete");
        Ok(SyncReport {
            kind,
            provenance,
            count,
        })
    }

    // ─── Queries ───────────────────────────────────────────

    pub fn books(&self) -> Subscription<Book> {
        self.store.query_all_books()
    }

    pub fn favorite_books(&self) -> Subscription<Book> {
        self.store.query_books_where(BookFilter::Favorites)
    }

    pub fn books_in_category(&self, category: impl Into<String>) -> Subscription<Book> {
        self.store
            .query_books_where(BookFilter::Category(category.into()))
    }

    /// Books whose `author` string equals `author.name` exactly.
    pub fn books_of(&self, author: &Author) -> Subscription<Book> {
        self.store
            .query_books_where(BookFilter::Author(author.name.clone()))
    }

    pub fn authors(&self) -> Subscription<Author> {
        self.store.query_all_authors()
    }

    pub fn popular_authors(&self) -> Subscription<Author> {
        self.store.query_authors_where(AuthorFilter::Popular)
    }

    pub fn book(&self, id: i64) -> Result<Option<Book>> {
        self.store.query_book_by_id(id)
    }

    pub fn author(&self, id: i64) -> Result<Option<Author>> {
        self.store.query_author_by_id(id)
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        self.store.categories()
    }

    // ─── Favorites ─────────────────────────────────────────

    /// Flip the stored flag. `None` means no such book.
    pub fn toggle_favorite(&self, book_id: i64) -> Result<Option<bool>> {
        self.store.toggle_favorite(book_id)
    }

    pub fn set_favorite(&self, book_id: i64, value: bool) -> Result<bool> {
        self.store.set_favorite(book_id, value)
    }
}
