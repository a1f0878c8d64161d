//! Verse walkers, one per dialect
//!
//! A walker reads a parsed document under its dialect's structural rules and
//! lazily yields a `WalkEvent` per verse-level element: either a normalized
//! verse, or the reason the element was passed over. Structural problems never
//! stop the walk, they only skip the unit they occur in.

pub mod tag_stream;
pub mod hierarchical_division;
pub mod attribute_based;

use crate::types::{Dialect, WalkEvent};
use crate::xml_document::ParsedDocument;

pub use tag_stream::TagStreamWalker;
pub use hierarchical_division::HierarchicalDivisionWalker;
pub use attribute_based::AttributeBasedWalker;

pub type WalkEvents<'a> = Box<dyn Iterator<Item = WalkEvent> + 'a>;

pub trait VerseWalker {
    /// Walk the document from the start. Each call starts a fresh walk.
    fn walk<'a>(&self, doc: &'a ParsedDocument) -> WalkEvents<'a>;
}

impl Dialect {
    pub fn walker(&self) -> &'static dyn VerseWalker {
        match self {
            Dialect::TagStream => &TagStreamWalker,
            Dialect::HierarchicalDivision => &HierarchicalDivisionWalker,
            Dialect::AttributeBased => &AttributeBasedWalker,
        }
    }

    pub fn walk<'a>(&self, doc: &'a ParsedDocument) -> WalkEvents<'a> {
        self.walker().walk(doc)
    }
}
