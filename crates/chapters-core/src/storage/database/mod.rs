mod connection;
mod migrations;
mod schema;

pub use connection::ConnectionPool;
pub use migrations::{SchemaOutcome, get_schema_version, run_migrations};
pub use schema::{SCHEMA_VERSION, init_schema};

use std::path::Path;

use tracing::info;

use crate::error::Result;

pub fn open_database(path: &Path) -> Result<ConnectionPool> {
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection();
        let outcome = migrations::run_migrations(&conn)?;
        info!(path = %path.display(), ?outcome, "opened catalog database");
    }
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection();
        migrations::run_migrations(&conn)?;
    }
    Ok(pool)
}
