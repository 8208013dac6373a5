use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::{Author, AuthorFilter};

use super::Repository;

pub trait AuthorRepository: Repository<Entity = Author, Id = i64> {
    fn list(&self, filter: AuthorFilter) -> Result<Vec<Author>>;
}

pub struct SqliteAuthorRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteAuthorRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_author(row: &Row) -> rusqlite::Result<Author> {
        Ok(Author {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            profile_image_url: row.get(3)?,
            is_popular: row.get(4)?,
        })
    }
}

impl<'a> Repository for SqliteAuthorRepository<'a> {
    type Entity = Author;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let author = self
            .conn
            .query_row(
                "SELECT id, name, description, profile_image_url, is_popular
                 FROM authors WHERE id = ?1",
                params![id],
                Self::row_to_author,
            )
            .optional()?;
        Ok(author)
    }

    fn upsert_all(&self, authors: &[Self::Entity]) -> Result<usize> {
        if authors.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO authors (id, name, description, profile_image_url, is_popular)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name              = excluded.name,
                    description       = excluded.description,
                    profile_image_url = excluded.profile_image_url,
                    is_popular        = excluded.is_popular",
            )?;
            for author in authors {
                stmt.execute(params![
                    author.id,
                    author.name,
                    author.description,
                    author.profile_image_url,
                    author.is_popular,
                ])?;
            }
        }
        tx.commit()?;

        Ok(authors.len())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn retain_only(&self, keep: &[Self::Id]) -> Result<usize> {
        super::retain_ids(self.conn, "authors", keep)
    }
}

impl<'a> AuthorRepository for SqliteAuthorRepository<'a> {
    fn list(&self, filter: AuthorFilter) -> Result<Vec<Author>> {
        let sql = match filter {
            AuthorFilter::All => {
                "SELECT id, name, description, profile_image_url, is_popular
                 FROM authors ORDER BY rowid"
            }
            AuthorFilter::Popular => {
                "SELECT id, name, description, profile_image_url, is_popular
                 FROM authors WHERE is_popular = 1 ORDER BY rowid"
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], Self::row_to_author)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::init_schema;

    #[test]
    fn test_upsert_and_filter_popular() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = SqliteAuthorRepository::new(&conn);

        repo.upsert_all(&[
            Author { is_popular: true, ..Author::new(1, "Emily Henry") },
            Author::new(2, "Ali Hazelwood"),
            Author { is_popular: true, ..Author::new(3, "Dan Brown") },
        ])
        .unwrap();

        assert_eq!(repo.count().unwrap(), 3);
        let popular: Vec<String> = repo
            .list(AuthorFilter::Popular)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(popular, vec!["Emily Henry", "Dan Brown"]);
    }

    #[test]
    fn test_find_missing_author() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let repo = SqliteAuthorRepository::new(&conn);
        assert!(repo.find_by_id(&8).unwrap().is_none());
    }
}
