use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::Book;
use crate::storage::Subscription;
use crate::sync::CatalogRepository;

/// The ids of currently favorited books, derived from the store.
///
/// This is a disposable view: it is never written to directly. Toggles go
/// through the repository and the set is rebuilt from the favorites query,
/// so two views over the same store cannot drift apart.
pub struct FavoriteSet {
    repo: Arc<CatalogRepository>,
    stream: Subscription<Book>,
    ids: BTreeSet<i64>,
}

impl FavoriteSet {
    pub async fn new(repo: Arc<CatalogRepository>) -> Result<Self> {
        let mut stream = repo.favorite_books();
        let ids = collect_ids(stream.next().await?);
        Ok(Self { repo, stream, ids })
    }

    /// Re-read the favorites from the store without waiting for a change.
    pub fn refresh(&mut self) -> Result<()> {
        self.ids = collect_ids(self.stream.current()?);
        Ok(())
    }

    /// Wait for the next committed change to the books table.
    pub async fn next_change(&mut self) -> Result<Vec<Book>> {
        let books = self.stream.next().await?;
        self.ids = books.iter().map(|b| b.id).collect();
        Ok(books)
    }

    pub fn contains(&self, book_id: i64) -> bool {
        self.ids.contains(&book_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Flip the flag in the store, then rebuild. `None` for an unknown id.
    pub fn toggle(&mut self, book_id: i64) -> Result<Option<bool>> {
        let value = self.repo.toggle_favorite(book_id)?;
        debug!(book_id, ?value, "favorite toggled");
        self.refresh()?;
        Ok(value)
    }
}

fn collect_ids(books: Vec<Book>) -> BTreeSet<i64> {
    books.into_iter().map(|b| b.id).collect()
}
