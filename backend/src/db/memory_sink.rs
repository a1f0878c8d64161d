use anyhow::{bail, Result};

use crate::db::sink::VerseSink;
use crate::types::{TranslationIdentity, VerseRecord};

/// A `VerseSink` that keeps rows in memory. Used for dry runs and tests.
///
/// Rows written inside a unit of work stay pending until `commit()`, so a
/// rollback is observable the same way as with a database.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub translations: Vec<(i32, TranslationIdentity)>,
    pub verses: Vec<(i32, VerseRecord)>,
    pending_translations: Vec<(i32, TranslationIdentity)>,
    pending_verses: Vec<(i32, VerseRecord)>,
    deleted_translation_ids: Vec<i32>,
    in_transaction: bool,
    next_id: i32,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed verses of one translation.
    pub fn verses_of(&self, translation_id: i32) -> Vec<&VerseRecord> {
        self.verses
            .iter()
            .filter(|(id, _)| *id == translation_id)
            .map(|(_, v)| v)
            .collect()
    }

    fn ensure_transaction(&self) -> Result<()> {
        if !self.in_transaction {
            bail!("No transaction in progress");
        }
        Ok(())
    }
}

impl VerseSink for MemorySink {
    fn begin(&mut self) -> Result<()> {
        if self.in_transaction {
            bail!("Transaction already in progress");
        }
        self.in_transaction = true;
        Ok(())
    }

    fn insert_translation(&mut self, identity: &TranslationIdentity) -> Result<i32> {
        self.ensure_transaction()?;
        self.next_id += 1;
        self.pending_translations.push((self.next_id, identity.clone()));
        Ok(self.next_id)
    }

    fn delete_translations(&mut self, identifier: &str) -> Result<usize> {
        self.ensure_transaction()?;
        let ids: Vec<i32> = self.translations
            .iter()
            .chain(self.pending_translations.iter())
            .filter(|(id, t)| t.identifier == identifier && !self.deleted_translation_ids.contains(id))
            .map(|(id, _)| *id)
            .collect();
        self.deleted_translation_ids.extend(&ids);
        Ok(ids.len())
    }

    fn insert_verses(&mut self, translation_id: i32, verses: &[VerseRecord]) -> Result<usize> {
        self.ensure_transaction()?;
        self.pending_verses.extend(verses.iter().map(|v| (translation_id, v.clone())));
        Ok(verses.len())
    }

    fn commit(&mut self) -> Result<()> {
        self.ensure_transaction()?;
        self.translations.append(&mut self.pending_translations);
        self.verses.append(&mut self.pending_verses);

        let deleted = std::mem::take(&mut self.deleted_translation_ids);
        self.translations.retain(|(id, _)| !deleted.contains(id));
        self.verses.retain(|(id, _)| !deleted.contains(id));

        self.in_transaction = false;
        self.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.ensure_transaction()?;
        self.pending_translations.clear();
        self.pending_verses.clear();
        self.deleted_translation_ids.clear();
        self.in_transaction = false;
        self.rollbacks += 1;
        Ok(())
    }
}
