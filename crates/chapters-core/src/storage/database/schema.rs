use rusqlite::Connection;

use crate::error::Result;

/// Bumping this drops and recreates the cache tables on next open.
/// Favorite flags do not survive a bump.
pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_meta (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS books (
            id              INTEGER PRIMARY KEY,
            title           TEXT NOT NULL DEFAULT '',
            author          TEXT NOT NULL DEFAULT '',
            category        TEXT NOT NULL DEFAULT '',
            description     TEXT NOT NULL DEFAULT '',
            cover_image_url TEXT NOT NULL DEFAULT '',
            is_favorite     INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS authors (
            id                INTEGER PRIMARY KEY,
            name              TEXT NOT NULL DEFAULT '',
            description       TEXT NOT NULL DEFAULT '',
            profile_image_url TEXT NOT NULL DEFAULT '',
            is_popular        INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_books_category   ON books(category);
        CREATE INDEX IF NOT EXISTS idx_books_author     ON books(author);
        CREATE INDEX IF NOT EXISTS idx_books_favorite   ON books(is_favorite);
        CREATE INDEX IF NOT EXISTS idx_authors_popular  ON authors(is_popular);
        ",
    )?;
    Ok(())
}

pub fn drop_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS books;
        DROP TABLE IF EXISTS authors;
        DROP TABLE IF EXISTS schema_meta;
        ",
    )?;
    Ok(())
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}
