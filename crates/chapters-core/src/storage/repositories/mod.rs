mod author_repository;
mod book_repository;

pub use author_repository::{AuthorRepository, SqliteAuthorRepository};
pub use book_repository::{BookRepository, SqliteBookRepository};

use std::collections::HashSet;

use rusqlite::{Connection, params};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;

    /// Insert-or-replace keyed by id, applied as one transaction.
    /// Returns the number of records written.
    fn upsert_all(&self, entities: &[Self::Entity]) -> Result<usize>;

    fn count(&self) -> Result<usize>;

    /// Delete every row whose id is not in `keep`. Returns the number removed.
    fn retain_only(&self, keep: &[Self::Id]) -> Result<usize>;
}

/// Shared body of `retain_only` for the integer-keyed cache tables.
pub(crate) fn retain_ids(conn: &Connection, table: &str, keep: &[i64]) -> Result<usize> {
    let keep: HashSet<i64> = keep.iter().copied().collect();

    let tx = conn.unchecked_transaction()?;
    let stale: Vec<i64> = {
        let mut stmt = tx.prepare(&format!("SELECT id FROM {table}"))?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        ids.into_iter().filter(|id| !keep.contains(id)).collect()
    };
    {
        let mut stmt = tx.prepare(&format!("DELETE FROM {table} WHERE id = ?1"))?;
        for id in &stale {
            stmt.execute(params![id])?;
        }
    }
    tx.commit()?;

    Ok(stale.len())
}
