//! Import of translation files into a `VerseSink`
//!
//! One file is read, parsed, detected and walked start to finish before the next
//! one. Verses are written in batches and committed every `batch_size` verses.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use walkdir::WalkDir;

use crate::db::VerseSink;
use crate::dialect::detect_dialect;
use crate::encoding::read_xml_file;
use crate::helpers::translation_identity_from_path;
use crate::logger;
use crate::types::{Dialect, ImportError, ImportSummary, TranslationIdentity, VerseRecord, WalkEvent};
use crate::xml_document::{Element, ParsedDocument};
use crate::DEFAULT_BATCH_SIZE;

/// File extensions picked up from the bibles directory.
const BIBLE_FILE_EXTENSIONS: [&str; 3] = ["xml", "usfx", "osis"];

/// Statistics from importing a directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub verses_imported: usize,
    pub verses_skipped: usize,
}

#[derive(Debug, Default)]
struct StreamStats {
    translation_id: Option<i32>,
    verses_imported: usize,
    verses_committed: usize,
    verses_skipped: usize,
    batches_committed: usize,
}

impl StreamStats {
    /// Error context for a failed import. Rows committed by earlier batches stay in
    /// the sink, so their translation id is reported for cleanup.
    fn failure_context(&self, filename: &str) -> String {
        match self.translation_id {
            Some(id) if self.batches_committed > 0 => format!(
                "Failed importing {}: translation id {} kept with {} committed verses",
                filename, id, self.verses_committed
            ),
            _ => format!("Failed importing {}", filename),
        }
    }
}

pub struct BibleImporter<S: VerseSink> {
    sink: S,
    batch_size: usize,
    overwrite: bool,
}

impl<S: VerseSink> BibleImporter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
            overwrite: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Delete earlier translations with the same identifier before importing.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Import one translation file.
    ///
    /// The file is parsed and its dialect detected before the sink is touched, so a
    /// `MalformedDocument` or `UnrecognizedDialect` leaves no trace in the sink.
    /// Failures after that roll back the open unit of work and are returned as
    /// `ImportFailed`. Batches committed before the failure stay committed, and the
    /// error names their translation id and verse count.
    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary, ImportError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        logger::info(&format!("Importing {}", path.display()));

        let identity = translation_identity_from_path(path)?;
        let content = read_xml_file(path)?;
        let doc = ParsedDocument::parse(&content)?;
        let dialect = detect_dialect(&doc)?;

        logger::info(&format!(
            "Language: {}, translation: {}, dialect: {}",
            identity.language_code, identity.identifier, dialect
        ));

        self.sink.begin().map_err(ImportError::ImportFailed)?;

        let mut stats = StreamStats::default();
        match self.stream_verses(&identity, dialect, &doc, &mut stats) {
            Ok(translation_id) => {
                logger::info(&format!(
                    "Imported {} verses from {} ({} skipped)",
                    stats.verses_imported, filename, stats.verses_skipped
                ));
                Ok(ImportSummary {
                    filename,
                    identity,
                    dialect,
                    translation_id,
                    verses_imported: stats.verses_imported,
                    verses_skipped: stats.verses_skipped,
                    batches_committed: stats.batches_committed,
                })
            }
            Err(e) => {
                if let Err(rb) = self.sink.rollback() {
                    logger::error(&format!("Rollback failed for {}: {:#}", filename, rb));
                }
                Err(ImportError::ImportFailed(e.context(stats.failure_context(&filename))))
            }
        }
    }

    fn stream_verses(
        &mut self,
        identity: &TranslationIdentity,
        dialect: Dialect,
        doc: &ParsedDocument,
        stats: &mut StreamStats,
    ) -> Result<i32> {
        if self.overwrite {
            let removed = self.sink.delete_translations(&identity.identifier)?;
            if removed > 0 {
                logger::info(&format!("Removed {} earlier import(s) of {}", removed, identity.identifier));
            }
        }

        let translation_id = self.sink.insert_translation(identity)?;
        stats.translation_id = Some(translation_id);
        logger::debug(&format!("Created translation id: {}", translation_id));

        let mut batch: Vec<VerseRecord> = Vec::with_capacity(self.batch_size);

        for event in dialect.walk(doc) {
            match event {
                WalkEvent::Verse(verse) => {
                    batch.push(verse);
                    if batch.len() >= self.batch_size {
                        self.commit_batch(translation_id, &mut batch, stats)?;
                        logger::info(&format!("Imported {} verses...", stats.verses_imported));
                        self.sink.begin()?;
                    }
                }
                WalkEvent::Skipped(reason) => {
                    stats.verses_skipped += 1;
                    logger::debug(&format!("Skipped element: {:?}", reason));
                }
            }
        }

        self.commit_batch(translation_id, &mut batch, stats)?;

        Ok(translation_id)
    }

    fn commit_batch(
        &mut self,
        translation_id: i32,
        batch: &mut Vec<VerseRecord>,
        stats: &mut StreamStats,
    ) -> Result<()> {
        // An empty tail still commits, to close the open transaction.
        let inserted = if batch.is_empty() {
            0
        } else {
            let n = self.sink.insert_verses(translation_id, batch)?;
            batch.clear();
            n
        };
        stats.verses_imported += inserted;
        self.sink.commit()?;
        if inserted > 0 {
            stats.batches_committed += 1;
            stats.verses_committed = stats.verses_imported;
        }
        Ok(())
    }

    /// Import every translation file in `dir`, or only the file named `only`.
    ///
    /// A document that fails is logged, counted and passed to `on_file`, then the
    /// next document is imported.
    pub fn import_directory<F>(&mut self, dir: &Path, only: Option<&str>, mut on_file: F) -> Result<ImportStats>
    where
        F: FnMut(&Path, &Result<ImportSummary, ImportError>),
    {
        let mut files = list_bible_files(dir)?;

        if let Some(name) = only {
            files.retain(|p| p.file_name().and_then(|n| n.to_str()) == Some(name));
            if files.is_empty() {
                bail!("Translation file not found in {:?}: {}", dir, name);
            }
        }

        logger::info(&format!("Total translation files found: {}", files.len()));

        let mut stats = ImportStats::default();
        for path in &files {
            let result = self.import_file(path);
            stats.files_processed += 1;
            match &result {
                Ok(summary) => {
                    stats.verses_imported += summary.verses_imported;
                    stats.verses_skipped += summary.verses_skipped;
                }
                Err(e) => {
                    stats.files_failed += 1;
                    logger::error(&format!("Error importing {}: {:#}", path.display(), e));
                }
            }
            on_file(path, &result);
        }

        Ok(stats)
    }
}

/// Translation files directly inside `dir`, sorted by name.
pub fn list_bible_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Bibles directory not found: {:?}", dir);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
        let path = entry.path();
        let is_bible_file = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| BIBLE_FILE_EXTENSIONS.contains(&e));

        if entry.file_type().is_file() && is_bible_file {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Top-level shape of a document, for inspecting an unfamiliar file.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutline {
    pub root_tag: String,
    pub dialect: Option<Dialect>,
    pub namespaces: Vec<(String, String)>,
    pub children: Vec<ChildOutline>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChildOutline {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub first_child_tag: Option<String>,
}

impl ChildOutline {
    fn from_element(el: &Element) -> Self {
        Self {
            tag: el.tag(),
            attributes: el.attributes().to_vec(),
            first_child_tag: el.children().first().map(|c| c.tag()),
        }
    }
}

/// Root tag, namespaces, detected dialect and the first two children of the root.
pub fn analyze_file(path: &Path) -> Result<DocumentOutline, ImportError> {
    let content = read_xml_file(path)?;
    let doc = ParsedDocument::parse(&content)?;
    Ok(outline(&doc))
}

pub fn outline(doc: &ParsedDocument) -> DocumentOutline {
    let root = doc.root();
    DocumentOutline {
        root_tag: root.tag(),
        dialect: detect_dialect(doc).ok(),
        namespaces: root.namespace_declarations().to_vec(),
        children: root.children().iter().take(2).map(ChildOutline::from_element).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySink;

    const USFX: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<usfx xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<book id="GEN"><h>Genesis</h>
<c id="1"/><p><v id="1"/>In the beginning<ve/></p>
<v id="1">In the beginning God created the heavens and the earth.</v>
<v id="2">The earth was formless and empty.</v>
<c id="2"/>
<v id="1">The heavens and the earth were finished.</v>
</book>
</usfx>"#;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_import_file_into_memory_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let mut importer = BibleImporter::new(MemorySink::new());
        let summary = importer.import_file(&path).unwrap();

        assert_eq!(summary.dialect, Dialect::TagStream);
        assert_eq!(summary.identity.identifier, "web");
        assert_eq!(summary.verses_imported, 3);
        // The empty milestone <v id="1"/> inside <p>
        assert_eq!(summary.verses_skipped, 1);

        let sink = importer.into_sink();
        let verses = sink.verses_of(summary.translation_id);
        let coords: Vec<(i32, i32)> = verses.iter().map(|v| (v.chapter, v.verse)).collect();
        assert_eq!(coords, vec![(1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn test_batches_commit_every_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let mut importer = BibleImporter::new(MemorySink::new()).with_batch_size(2);
        let summary = importer.import_file(&path).unwrap();

        // 2 verses, then the tail of 1
        assert_eq!(summary.batches_committed, 2);
        assert_eq!(importer.sink().commits, 2);
    }

    #[test]
    fn test_reimport_creates_second_translation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let mut importer = BibleImporter::new(MemorySink::new());
        let first = importer.import_file(&path).unwrap();
        let second = importer.import_file(&path).unwrap();

        assert_ne!(first.translation_id, second.translation_id);
        assert_eq!(importer.sink().translations.len(), 2);
        assert_eq!(importer.sink().verses.len(), 6);
    }

    #[test]
    fn test_overwrite_replaces_earlier_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let mut importer = BibleImporter::new(MemorySink::new()).with_overwrite(true);
        importer.import_file(&path).unwrap();
        let second = importer.import_file(&path).unwrap();

        let sink = importer.sink();
        assert_eq!(sink.translations.len(), 1);
        assert_eq!(sink.translations[0].0, second.translation_id);
        assert_eq!(sink.verses.len(), 3);
    }

    #[test]
    fn test_bad_documents_do_not_touch_sink() {
        let dir = tempfile::tempdir().unwrap();
        let malformed = write_file(dir.path(), "eng-bad.xml", "<usfx><book id=\"GEN\"></usfx>");
        let unknown = write_file(dir.path(), "eng-odd.xml", "<bible/>");

        let mut importer = BibleImporter::new(MemorySink::new());
        assert!(matches!(importer.import_file(&malformed), Err(ImportError::MalformedDocument(_))));
        assert!(matches!(
            importer.import_file(&unknown),
            Err(ImportError::UnrecognizedDialect { root_tag }) if root_tag == "bible"
        ));
        assert_eq!(importer.sink().commits + importer.sink().rollbacks, 0);
    }

    #[test]
    fn test_bad_file_name_fails_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "kjv.xml", USFX);

        let mut importer = BibleImporter::new(MemorySink::new());
        assert!(matches!(importer.import_file(&path), Err(ImportError::ImportFailed(_))));
    }

    #[test]
    fn test_import_directory_continues_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "eng-web.usfx.xml", USFX);
        write_file(dir.path(), "eng-bad.xml", "<usfx>");
        write_file(dir.path(), "notes.txt", "not a bible");

        let mut seen = Vec::new();
        let mut importer = BibleImporter::new(MemorySink::new());
        let stats = importer
            .import_directory(dir.path(), None, |path, result| {
                seen.push((path.file_name().unwrap().to_string_lossy().to_string(), result.is_ok()));
            })
            .unwrap();

        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.verses_imported, 3);
        assert_eq!(seen, vec![
            ("eng-bad.xml".to_string(), false),
            ("eng-web.usfx.xml".to_string(), true),
        ]);
    }

    #[test]
    fn test_import_directory_single_translation() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "eng-web.usfx.xml", USFX);
        write_file(dir.path(), "eng-bad.xml", "<usfx>");

        let mut importer = BibleImporter::new(MemorySink::new());
        let stats = importer.import_directory(dir.path(), Some("eng-web.usfx.xml"), |_, _| {}).unwrap();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_failed, 0);

        assert!(importer.import_directory(dir.path(), Some("eng-kjv.xml"), |_, _| {}).is_err());
    }

    /// Fails on the n-th `insert_verses` call.
    struct FailingSink {
        inner: MemorySink,
        fail_on: usize,
        calls: usize,
    }

    impl VerseSink for FailingSink {
        fn begin(&mut self) -> Result<()> {
            self.inner.begin()
        }
        fn insert_translation(&mut self, identity: &TranslationIdentity) -> Result<i32> {
            self.inner.insert_translation(identity)
        }
        fn delete_translations(&mut self, identifier: &str) -> Result<usize> {
            self.inner.delete_translations(identifier)
        }
        fn insert_verses(&mut self, translation_id: i32, verses: &[VerseRecord]) -> Result<usize> {
            self.calls += 1;
            if self.calls == self.fail_on {
                bail!("disk full");
            }
            self.inner.insert_verses(translation_id, verses)
        }
        fn commit(&mut self) -> Result<()> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> Result<()> {
            self.inner.rollback()
        }
    }

    #[test]
    fn test_failure_rolls_back_open_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let sink = FailingSink { inner: MemorySink::new(), fail_on: 2, calls: 0 };
        let mut importer = BibleImporter::new(sink).with_batch_size(2);

        let err = importer.import_file(&path).unwrap_err();
        assert!(matches!(err, ImportError::ImportFailed(_)));
        assert_eq!(
            err.to_string(),
            "Import failed: Failed importing eng-web.usfx.xml: translation id 1 kept with 2 committed verses: disk full"
        );

        let sink = importer.into_sink().inner;
        assert_eq!(sink.rollbacks, 1);
        // The first batch was committed before the failure
        assert_eq!(sink.commits, 1);
        assert_eq!(sink.verses.len(), 2);

        // The sink is usable again afterwards
        let mut importer = BibleImporter::new(sink);
        assert_eq!(importer.import_file(&path).unwrap().verses_imported, 3);
    }

    #[test]
    fn test_failure_in_first_batch_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let sink = FailingSink { inner: MemorySink::new(), fail_on: 1, calls: 0 };
        let mut importer = BibleImporter::new(sink);

        let err = importer.import_file(&path).unwrap_err();
        assert_eq!(err.to_string(), "Import failed: Failed importing eng-web.usfx.xml: disk full");

        let sink = importer.into_sink().inner;
        assert!(sink.translations.is_empty());
        assert!(sink.verses.is_empty());
    }

    #[test]
    fn test_empty_tail_is_not_counted_as_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "eng-web.usfx.xml", USFX);

        let mut importer = BibleImporter::new(MemorySink::new()).with_batch_size(3);
        let summary = importer.import_file(&path).unwrap();

        assert_eq!(summary.batches_committed, 1);
        // The empty tail still closes its transaction
        assert_eq!(importer.sink().commits, 2);
    }

    #[test]
    fn test_outline() {
        let doc = ParsedDocument::parse(USFX).unwrap();
        let outline = outline(&doc);
        assert_eq!(outline.root_tag, "usfx");
        assert_eq!(outline.dialect, Some(Dialect::TagStream));
        assert_eq!(outline.namespaces[0].0, "xmlns:xsi");
        assert_eq!(outline.children.len(), 1);
        assert_eq!(outline.children[0].attributes, vec![("id".to_string(), "GEN".to_string())]);
        assert_eq!(outline.children[0].first_child_tag.as_deref(), Some("h"));
    }
}
