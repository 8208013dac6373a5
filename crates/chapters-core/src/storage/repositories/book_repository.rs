use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::models::{Book, BookFilter};

use super::Repository;

pub trait BookRepository: Repository<Entity = Book, Id = i64> {
    fn list(&self, filter: &BookFilter) -> Result<Vec<Book>>;
    fn set_favorite(&self, id: i64, value: bool) -> Result<bool>;
    fn toggle_favorite(&self, id: i64) -> Result<Option<bool>>;
    fn categories(&self) -> Result<Vec<String>>;
}

pub struct SqliteBookRepository<'a> {
    conn: &'a Connection,
}

const BOOK_COLUMNS: &str =
    "id, title, author, category, description, cover_image_url, is_favorite";

impl<'a> SqliteBookRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn row_to_book(row: &Row) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            category: row.get(3)?,
            description: row.get(4)?,
            cover_image_url: row.get(5)?,
            is_favorite: row.get(6)?,
        })
    }

    fn select<P: rusqlite::Params>(&self, clause: &str, params: P) -> Result<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {BOOK_COLUMNS} FROM books {clause}"))?;
        let rows = stmt
            .query_map(params, Self::row_to_book)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl<'a> Repository for SqliteBookRepository<'a> {
    type Entity = Book;
    type Id = i64;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>> {
        let book = self
            .conn
            .query_row(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
                params![id],
                Self::row_to_book,
            )
            .optional()?;
        Ok(book)
    }

    /// Replace-on-id-collision. The row keeps its rowid, so catalog order is
    /// first-insertion order even across re-syncs.
    fn upsert_all(&self, books: &[Self::Entity]) -> Result<usize> {
        if books.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO books
                    (id, title, author, category, description, cover_image_url, is_favorite)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    title           = excluded.title,
                    author          = excluded.author,
                    category        = excluded.category,
                    description     = excluded.description,
                    cover_image_url = excluded.cover_image_url,
                    is_favorite     = excluded.is_favorite",
            )?;
            for book in books {
                stmt.execute(params![
                    book.id,
                    book.title,
                    book.author,
                    book.category,
                    book.description,
                    book.cover_image_url,
                    book.is_favorite,
                ])?;
            }
        }
        tx.commit()?;

        Ok(books.len())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn retain_only(&self, keep: &[Self::Id]) -> Result<usize> {
        super::retain_ids(self.conn, "books", keep)
    }
}

impl<'a> BookRepository for SqliteBookRepository<'a> {
    fn list(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        match filter {
            BookFilter::All => self.select("ORDER BY rowid", []),
            BookFilter::Favorites => self.select("WHERE is_favorite = 1 ORDER BY rowid", []),
            BookFilter::Category(category) => {
                self.select("WHERE category = ?1 ORDER BY rowid", params![category])
            }
            // BINARY collation: exact, case-sensitive match.
            BookFilter::Author(name) => {
                self.select("WHERE author = ?1 ORDER BY rowid", params![name])
            }
        }
    }

    fn set_favorite(&self, id: i64, value: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE books SET is_favorite = ?1 WHERE id = ?2",
            params![value, id],
        )?;
        Ok(updated > 0)
    }

    fn toggle_favorite(&self, id: i64) -> Result<Option<bool>> {
        // The flip reads the stored value inside the same statement, so
        // repeated toggles can never act on a stale copy.
        let value = self
            .conn
            .query_row(
                "UPDATE books SET is_favorite = NOT is_favorite WHERE id = ?1
                 RETURNING is_favorite",
                params![id],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn categories(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT category FROM books GROUP BY category ORDER BY MIN(rowid)",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(Into::into)
    }
}
