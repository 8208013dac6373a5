use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, warn};

use super::schema::{self, SCHEMA_VERSION};
use crate::error::Result;

/// What opening the database did to the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    Created,
    Current,
    Rebuilt { from: u32 },
}

fn user_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn record_version(conn: &Connection, version: u32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_meta(version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![version, Utc::now().to_rfc3339()],
    )?;
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// The cache holds nothing that cannot be re-fetched except favorite flags,
/// so any version other than the current one is dropped and rebuilt.
pub fn run_migrations(conn: &Connection) -> Result<SchemaOutcome> {
    migrate_to(conn, SCHEMA_VERSION)
}

pub(crate) fn migrate_to(conn: &Connection, target: u32) -> Result<SchemaOutcome> {
    let found = user_version(conn)?;

    if found == target {
        debug!(version = found, "schema is current");
        return Ok(SchemaOutcome::Current);
    }

    let tx = conn.unchecked_transaction()?;
    let outcome = if found == 0 {
        schema::init_schema(&tx)?;
        SchemaOutcome::Created
    } else {
        warn!(
            from = found,
            to = target,
            "schema version changed, rebuilding cache (favorites are discarded)"
        );
        schema::drop_tables(&tx)?;
        schema::init_schema(&tx)?;
        SchemaOutcome::Rebuilt { from: found }
    };
    record_version(&tx, target)?;
    tx.commit()?;

    Ok(outcome)
}

pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    user_version(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_is_created() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), SchemaOutcome::Created);
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(run_migrations(&conn).unwrap(), SchemaOutcome::Current);
    }

    #[test]
    fn test_version_mismatch_rebuilds_and_drops_rows() {
        let conn = Connection::open_in_memory().unwrap();
        migrate_to(&conn, 1).unwrap();
        conn.execute(
            "INSERT INTO books (id, title, is_favorite) VALUES (1, 'Dune', 1)",
            [],
        )
        .unwrap();

        let outcome = run_migrations(&conn).unwrap();
        assert_eq!(outcome, SchemaOutcome::Rebuilt { from: 1 });

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
