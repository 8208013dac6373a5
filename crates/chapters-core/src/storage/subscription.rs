use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;

use super::CatalogStore;
use crate::error::Result;
use crate::models::EntityKind;

type Query<T> = Box<dyn Fn(&CatalogStore) -> Result<Vec<T>> + Send + Sync>;

/// A live query over one table.
///
/// The first [`next`](Self::next) yields the current result set immediately;
/// every later call waits for a committed write to the table and yields the
/// re-run query. The stream never ends.
pub struct Subscription<T> {
    store: Arc<CatalogStore>,
    changes: watch::Receiver<u64>,
    query: Query<T>,
    primed: bool,
}

impl<T> Subscription<T> {
    pub(crate) fn new(store: Arc<CatalogStore>, kind: EntityKind, query: Query<T>) -> Self {
        let changes = store.changes().subscribe(kind);
        Self {
            store,
            changes,
            query,
            primed: false,
        }
    }

    /// Run the query now without waiting or consuming a change.
    pub fn current(&self) -> Result<Vec<T>> {
        (self.query)(self.store.as_ref())
    }

    pub async fn next(&mut self) -> Result<Vec<T>> {
        if !self.primed {
            self.primed = true;
            self.changes.borrow_and_update();
            return self.current();
        }

        // The sender lives in the store this subscription keeps alive.
        if self.changes.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        // Several writes between two polls collapse into one emission.
        self.changes.borrow_and_update();
        self.current()
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>>>
    where
        T: Send + 'static,
    {
        futures::stream::unfold(self, |mut sub| async move {
            let item = sub.next().await;
            Some((item, sub))
        })
    }
}
