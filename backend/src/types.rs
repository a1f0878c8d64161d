use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// The three known XML schema families for scripture corpora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    /// USFX: flat `<book>`, `<c>`, `<v>` markers in document order.
    #[serde(rename = "usfx")]
    TagStream,
    /// OSIS: nested `<div type="book">`, `<chapter>`, `<verse>` with dotted osisIDs.
    #[serde(rename = "osis")]
    HierarchicalDivision,
    /// Zefania: `<BIBLEBOOK>`, `<CHAPTER>`, `<VERSE>` numbered by attributes.
    #[serde(rename = "zefania")]
    AttributeBased,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::TagStream => "usfx",
            Dialect::HierarchicalDivision => "osis",
            Dialect::AttributeBased => "zefania",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One verse with its book/chapter/verse coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseRecord {
    pub book_id: String,
    pub book_display_name: String,
    pub chapter: i32,
    pub verse: i32,
    pub text: String,
}

/// Translation metadata derived from the file name, e.g. `eng-kjv.osis.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationIdentity {
    pub identifier: String,
    pub language_code: String,
    pub display_name: String,
    pub language: String,
    pub license: String,
}

/// Why a walker passed over an element without emitting a verse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    MissingBookId,
    BadChapterId,
    BadVerseId,
    /// A verse element before any book or chapter marker.
    OutsideContext,
    EmptyText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    Verse(VerseRecord),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub filename: String,
    pub identity: TranslationIdentity,
    pub dialect: Dialect,
    pub translation_id: i32,
    pub verses_imported: usize,
    pub verses_skipped: usize,
    pub batches_committed: usize,
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unrecognized XML dialect, root tag: '{root_tag}'")]
    UnrecognizedDialect { root_tag: String },

    #[error("Malformed XML document: {0}")]
    MalformedDocument(String),

    #[error("Import failed: {0:#}")]
    ImportFailed(#[source] anyhow::Error),
}

impl From<anyhow::Error> for ImportError {
    fn from(e: anyhow::Error) -> Self {
        ImportError::ImportFailed(e)
    }
}
