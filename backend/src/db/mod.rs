pub mod bibles_models;
pub mod bibles_schema;
pub mod sink;
pub mod memory_sink;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub use memory_sink::MemorySink;
pub use sink::{SqliteSink, VerseSink};

pub const BIBLES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Connect to a SQLite database URL, e.g. `bibles.sqlite3`, `sqlite://bibles.sqlite3`
/// or `:memory:`. The parent directory of a file database is created if missing.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection> {
    let path = database_url.strip_prefix("sqlite://").unwrap_or(database_url);

    if path != ":memory:" {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    SqliteConnection::establish(path)
        .with_context(|| format!("Failed to connect to database: {}", database_url))
}

/// Create the tables if they don't exist yet.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    conn.run_pending_migrations(BIBLES_MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to execute pending database migrations: {}", e))?;
    Ok(())
}

/// Drop all tables and create them again, empty.
pub fn drop_tables(conn: &mut SqliteConnection) -> Result<()> {
    conn.revert_all_migrations(BIBLES_MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("Failed to revert database migrations: {}", e))?;
    run_migrations(conn)
}
