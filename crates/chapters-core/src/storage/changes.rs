use tokio::sync::watch;

use crate::models::EntityKind;

/// Per-table change notification. Each committed write bumps the table's
/// revision; subscribers wake and re-run their query.
pub struct ChangeBus {
    books: watch::Sender<u64>,
    authors: watch::Sender<u64>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (books, _) = watch::channel(0);
        let (authors, _) = watch::channel(0);
        Self { books, authors }
    }

    fn sender(&self, kind: EntityKind) -> &watch::Sender<u64> {
        match kind {
            EntityKind::Books => &self.books,
            EntityKind::Authors => &self.authors,
        }
    }

    /// Call only after the write has committed.
    pub fn notify(&self, kind: EntityKind) {
        self.sender(kind).send_modify(|rev| *rev += 1);
    }

    pub fn subscribe(&self, kind: EntityKind) -> watch::Receiver<u64> {
        self.sender(kind).subscribe()
    }

    pub fn revision(&self, kind: EntityKind) -> u64 {
        *self.sender(kind).borrow()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}
