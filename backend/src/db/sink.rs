//! Where imported translations and verses are written.

use anyhow::{Context, Result};
use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::db::bibles_models::{NewTranslation, NewVerse};
use crate::db::bibles_schema::{translations, verses};
use crate::types::{TranslationIdentity, VerseRecord};

/// Rows per INSERT statement, keeps the bound parameters under SQLite's limit.
const INSERT_CHUNK_SIZE: usize = 500;

/// The storage capability handed to the importer.
///
/// Work happens inside a unit of work opened with `begin()` and closed with
/// either `commit()` or `rollback()`.
pub trait VerseSink {
    fn begin(&mut self) -> Result<()>;

    /// Insert the translation row and return its generated id.
    fn insert_translation(&mut self, identity: &TranslationIdentity) -> Result<i32>;

    /// Delete earlier translations with this identifier together with their verses.
    /// Returns the number of translation rows removed.
    fn delete_translations(&mut self, identifier: &str) -> Result<usize>;

    fn insert_verses(&mut self, translation_id: i32, verses: &[VerseRecord]) -> Result<usize>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;
}

pub struct SqliteSink {
    conn: SqliteConnection,
}

impl SqliteSink {
    pub fn new(conn: SqliteConnection) -> Self {
        Self { conn }
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

impl VerseSink for SqliteSink {
    fn begin(&mut self) -> Result<()> {
        AnsiTransactionManager::begin_transaction(&mut self.conn)
            .context("Failed to begin transaction")
    }

    fn insert_translation(&mut self, identity: &TranslationIdentity) -> Result<i32> {
        let new_translation = NewTranslation::from(identity);
        diesel::insert_into(translations::table)
            .values(&new_translation)
            .returning(translations::id)
            .get_result::<i32>(&mut self.conn)
            .with_context(|| format!("Failed to insert translation: {}", identity.identifier))
    }

    fn delete_translations(&mut self, identifier: &str) -> Result<usize> {
        let ids: Vec<i32> = translations::table
            .filter(translations::identifier.eq(identifier))
            .select(translations::id)
            .load(&mut self.conn)
            .context("Failed to look up existing translations")?;

        if ids.is_empty() {
            return Ok(0);
        }

        diesel::delete(verses::table.filter(verses::translation_id.eq_any(&ids)))
            .execute(&mut self.conn)
            .context("Failed to delete verses")?;

        diesel::delete(translations::table.filter(translations::id.eq_any(&ids)))
            .execute(&mut self.conn)
            .context("Failed to delete translations")
    }

    fn insert_verses(&mut self, translation_id: i32, records: &[VerseRecord]) -> Result<usize> {
        let mut inserted = 0;
        for chunk in records.chunks(INSERT_CHUNK_SIZE) {
            let rows: Vec<NewVerse> = chunk
                .iter()
                .map(|v| NewVerse::from_record(translation_id, v))
                .collect();

            inserted += diesel::insert_into(verses::table)
                .values(&rows)
                .execute(&mut self.conn)
                .context("Failed to insert verses")?;
        }
        Ok(inserted)
    }

    fn commit(&mut self) -> Result<()> {
        AnsiTransactionManager::commit_transaction(&mut self.conn)
            .context("Failed to commit transaction")
    }

    fn rollback(&mut self) -> Result<()> {
        AnsiTransactionManager::rollback_transaction(&mut self.conn)
            .context("Failed to roll back transaction")
    }
}
