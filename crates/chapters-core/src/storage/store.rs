use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::changes::ChangeBus;
use super::database::{self, ConnectionPool};
use super::repositories::{
    AuthorRepository, BookRepository, Repository, SqliteAuthorRepository, SqliteBookRepository,
};
use super::subscription::Subscription;
use crate::error::Result;
use crate::models::{Author, AuthorFilter, Book, BookFilter, EntityKind};

/// Durable, queryable, observable cache of books and authors.
///
/// Constructed once at startup and shared as `Arc<CatalogStore>`. Writes
/// hold the connection lock for their whole transaction, so readers see
/// either none or all of a batch. Subscribers are notified after commit.
pub struct CatalogStore {
    pool: ConnectionPool,
    changes: ChangeBus,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            pool: database::open_database(path)?,
            changes: ChangeBus::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            pool: database::open_in_memory()?,
            changes: ChangeBus::new(),
        })
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }

    pub(crate) fn changes(&self) -> &ChangeBus {
        &self.changes
    }

    // ─── Writes ────────────────────────────────────────────

    pub fn upsert_books(&self, books: &[Book]) -> Result<usize> {
        let written = {
            let conn = self.pool.get_connection();
            SqliteBookRepository::new(&conn).upsert_all(books)?
        };
        if written > 0 {
            debug!(count = written, "upserted books");
            self.changes.notify(EntityKind::Books);
        }
        Ok(written)
    }

    pub fn upsert_authors(&self, authors: &[Author]) -> Result<usize> {
        let written = {
            let conn = self.pool.get_connection();
            SqliteAuthorRepository::new(&conn).upsert_all(authors)?
        };
        if written > 0 {
            debug!(count = written, "upserted authors");
            self.changes.notify(EntityKind::Authors);
        }
        Ok(written)
    }

    /// Returns `false` without touching anything when `book_id` is unknown.
    pub fn set_favorite(&self, book_id: i64, value: bool) -> Result<bool> {
        let updated = {
            let conn = self.pool.get_connection();
            SqliteBookRepository::new(&conn).set_favorite(book_id, value)?
        };
        if updated {
            self.changes.notify(EntityKind::Books);
        } else {
            debug!(book_id, "set_favorite on unknown book ignored");
        }
        Ok(updated)
    }

    /// Flip the stored flag and return the new value, or `None` for an
    /// unknown id.
    pub fn toggle_favorite(&self, book_id: i64) -> Result<Option<bool>> {
        let value = {
            let conn = self.pool.get_connection();
            SqliteBookRepository::new(&conn).toggle_favorite(book_id)?
        };
        if value.is_some() {
            self.changes.notify(EntityKind::Books);
        }
        Ok(value)
    }

    /// Delete books whose id is not in `ids`. Sync never calls this.
    pub fn reconcile_books(&self, ids: &[i64]) -> Result<usize> {
        let removed = {
            let conn = self.pool.get_connection();
            SqliteBookRepository::new(&conn).retain_only(ids)?
        };
        if removed > 0 {
            self.changes.notify(EntityKind::Books);
        }
        Ok(removed)
    }

    pub fn reconcile_authors(&self, ids: &[i64]) -> Result<usize> {
        let removed = {
            let conn = self.pool.get_connection();
            SqliteAuthorRepository::new(&conn).retain_only(ids)?
        };
        if removed > 0 {
            self.changes.notify(EntityKind::Authors);
        }
        Ok(removed)
    }

    // ─── Point reads & snapshots ───────────────────────────

    pub fn query_book_by_id(&self, id: i64) -> Result<Option<Book>> {
        let conn = self.pool.get_connection();
        SqliteBookRepository::new(&conn).find_by_id(&id)
    }

    pub fn query_author_by_id(&self, id: i64) -> Result<Option<Author>> {
        let conn = self.pool.get_connection();
        SqliteAuthorRepository::new(&conn).find_by_id(&id)
    }

    pub fn books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let conn = self.pool.get_connection();
        SqliteBookRepository::new(&conn).list(filter)
    }

    pub fn authors(&self, filter: AuthorFilter) -> Result<Vec<Author>> {
        let conn = self.pool.get_connection();
        SqliteAuthorRepository::new(&conn).list(filter)
    }

    pub fn books_by_author(&self, name: &str) -> Result<Vec<Book>> {
        self.books(&BookFilter::Author(name.to_string()))
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        let conn = self.pool.get_connection();
        SqliteBookRepository::new(&conn).categories()
    }

    pub fn count(&self, kind: EntityKind) -> Result<usize> {
        let conn = self.pool.get_connection();
        match kind {
            EntityKind::Books => SqliteBookRepository::new(&conn).count(),
            EntityKind::Authors => SqliteAuthorRepository::new(&conn).count(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_connection<R>(&self, f: impl FnOnce(&rusqlite::Connection) -> R) -> R {
        f(&self.pool.get_connection())
    }

    // ─── Live queries ──────────────────────────────────────

    pub fn query_all_books(self: &Arc<Self>) -> Subscription<Book> {
        self.query_books_where(BookFilter::All)
    }

    pub fn query_books_where(self: &Arc<Self>, filter: BookFilter) -> Subscription<Book> {
        Subscription::new(
            Arc::clone(self),
            EntityKind::Books,
            Box::new(move |store: &CatalogStore| store.books(&filter)),
        )
    }

    pub fn query_all_authors(self: &Arc<Self>) -> Subscription<Author> {
        self.query_authors_where(AuthorFilter::All)
    }

    pub fn query_authors_where(self: &Arc<Self>, filter: AuthorFilter) -> Subscription<Author> {
        Subscription::new(
            Arc::clone(self),
            EntityKind::Authors,
            Box::new(move |store: &CatalogStore| store.authors(filter)),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    fn sample_books() -> Vec<Book> {
        vec![
            Book::new(1, "Beach Read", "Emily Henry", "Romance"),
            Book::new(4, "The Silent Patient", "Alex Michaelides", "Mystery"),
            Book::new(7, "Dune", "Frank Herbert", "Science Fiction"),
        ]
    }

    #[test]
    fn test_upsert_then_query_all_returns_batch() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        store.upsert_books(&sample_books()).unwrap();

        let books = store.query_all_books().current().unwrap();
        assert_eq!(books, sample_books());
    }

    #[test]
    fn test_set_favorite_round_trip() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.upsert_books(&sample_books()).unwrap();

        assert!(store.set_favorite(7, true).unwrap());
        assert!(store.query_book_by_id(7).unwrap().unwrap().is_favorite);
    }

    #[test]
    fn test_set_favorite_unknown_id_is_silent() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.upsert_books(&sample_books()).unwrap();

        assert!(!store.set_favorite(999, true).unwrap());
        assert_eq!(store.count(EntityKind::Books).unwrap(), 3);
        assert!(store.books(&BookFilter::Favorites).unwrap().is_empty());
    }

    #[test]
    fn test_resync_replaces_favorite_flag() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        store.upsert_books(&sample_books()).unwrap();
        store.set_favorite(1, true).unwrap();

        let mut refreshed = sample_books();
        refreshed[0].title = "Beach Read (Anniversary Edition)".to_string();
        store.upsert_books(&refreshed).unwrap();

        assert_eq!(store.query_all_books().current().unwrap(), refreshed);
        assert!(!store.query_book_by_id(1).unwrap().unwrap().is_favorite);
    }

    #[test]
    fn test_books_by_author_is_exact_match() {
        let store = CatalogStore::open_in_memory().unwrap();
        store
            .upsert_books(&[
                Book::new(1, "First", "John Doe", "Mystery"),
                Book::new(2, "Second", "John Doe", "Mystery"),
                Book::new(3, "Other", "Jane Roe", "Mystery"),
            ])
            .unwrap();

        assert_eq!(store.books_by_author("John Doe").unwrap().len(), 2);
        assert!(store.books_by_author("J. Doe").unwrap().is_empty());
        assert!(store.books_by_author("john doe").unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_removes_only_missing_ids() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.upsert_books(&sample_books()).unwrap();

        assert_eq!(store.reconcile_books(&[1, 7]).unwrap(), 1);
        assert!(store.query_book_by_id(4).unwrap().is_none());
        assert_eq!(store.reconcile_books(&[1, 7]).unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache").join("chapters.db");
        {
            let store = CatalogStore::open(&path).unwrap();
            store.upsert_books(&sample_books()).unwrap();
            store.set_favorite(4, true).unwrap();
        }
        let store = CatalogStore::open(&path).unwrap();
        assert_eq!(store.count(EntityKind::Books).unwrap(), 3);
        assert!(store.query_book_by_id(4).unwrap().unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_subscription_reemits_after_upsert() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let mut sub = store.query_all_books();

        assert!(sub.next().await.unwrap().is_empty());

        store.upsert_books(&sample_books()).unwrap();
        let books = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(books.len(), 3);
    }

    #[tokio::test]
    async fn test_favorites_subscription_tracks_toggles() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        store.upsert_books(&sample_books()).unwrap();
        let mut favorites = store.query_books_where(BookFilter::Favorites);
        assert!(favorites.next().await.unwrap().is_empty());

        assert_eq!(store.toggle_favorite(4).unwrap(), Some(true));
        let ids: Vec<i64> = favorites.next().await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![4]);

        assert_eq!(store.toggle_favorite(4).unwrap(), Some(false));
        assert!(favorites.next().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_author_writes_do_not_wake_book_subscribers() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let mut books = store.query_all_books();
        books.next().await.unwrap();

        store.upsert_authors(&[Author::new(1, "Emily Henry")]).unwrap();
        let woke = tokio::time::timeout(Duration::from_millis(100), books.next()).await;
        assert!(woke.is_err());
    }

    #[test]
    fn test_reader_never_sees_partial_batch() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let batch = |round: usize| -> Vec<Book> {
            (1..=50)
                .map(|id| Book::new(id, format!("round-{round}"), "Writer", "Fantasy"))
                .collect()
        };
        store.upsert_books(&batch(0)).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for round in 1..=100 {
                    store.upsert_books(&batch(round)).unwrap();
                }
            })
        };

        for _ in 0..200 {
            let snapshot = store.books(&BookFilter::All).unwrap();
            assert_eq!(snapshot.len(), 50);
            let first = &snapshot[0].title;
            assert!(snapshot.iter().all(|b| &b.title == first));
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_toggles_interleave_with_bulk_upserts() {
        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let batch = |round: usize| -> Vec<Book> {
            (1..=50)
                .map(|id| Book::new(id, format!("round-{round}"), "Writer", "Fantasy"))
                .collect()
        };
        store.upsert_books(&batch(0)).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for round in 1..=100 {
                    store.upsert_books(&batch(round)).unwrap();
                }
            })
        };

        let mut last = false;
        for i in 0..300 {
            let id = (i % 5) as i64 + 1;
            last = store.toggle_favorite(id).unwrap().unwrap();
            store.set_favorite(10, i % 2 == 0).unwrap();
        }
        writer.join().unwrap();

        // Each row is either the writer's version or carries a later flag write.
        let books = store.books(&BookFilter::All).unwrap();
        assert_eq!(books.len(), 50);
        assert!(books.iter().all(|b| b.title == "round-100"));
        let final_id = (299 % 5) as i64 + 1;
        assert!(!books[final_id as usize - 1].is_favorite || last);
        assert!(books[10..].iter().all(|b| !b.is_favorite));

        assert!(store.set_favorite(final_id, true).unwrap());
        assert!(store.query_book_by_id(final_id).unwrap().unwrap().is_favorite);
    }

    #[tokio::test]
    async fn test_stream_yields_after_upsert_and_toggle() {
        use futures::StreamExt;

        let store = Arc::new(CatalogStore::open_in_memory().unwrap());
        let mut stream = Box::pin(store.query_books_where(BookFilter::Favorites).into_stream());
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        store.upsert_books(&sample_books()).unwrap();
        let after_upsert = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(after_upsert.is_empty());

        store.toggle_favorite(7).unwrap();
        let after_toggle = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let ids: Vec<i64> = after_toggle.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![7]);
    }
}
