//! USFX walker
//!
//! Books, chapters and verses are sibling-level markers in one long stream:
//! `<book id="GEN">`, `<c id="1"/>`, `<v id="1">...</v>`. The walk visits every
//! element in document order and keeps the current book and chapter as state.

use crate::helpers::{element_text_content, first_number};
use crate::types::{SkipReason, VerseRecord, WalkEvent};
use crate::xml_document::{Descendants, Element, ParsedDocument};

use super::{VerseWalker, WalkEvents};

pub struct TagStreamWalker;

impl VerseWalker for TagStreamWalker {
    fn walk<'a>(&self, doc: &'a ParsedDocument) -> WalkEvents<'a> {
        Box::new(TagStreamWalk {
            elements: doc.root().iter(),
            book: None,
            chapter: None,
        })
    }
}

struct TagStreamWalk<'a> {
    elements: Descendants<'a>,
    book: Option<&'a str>,
    chapter: Option<i32>,
}

impl<'a> TagStreamWalk<'a> {
    /// Update the walk state from one element, returning an event for verse
    /// markers and for markers that had to be skipped.
    fn visit(&mut self, el: &'a Element) -> Option<WalkEvent> {
        match el.name() {
            "book" => {
                self.book = el.attr("id").filter(|id| !id.is_empty());
                self.chapter = None;
                match self.book {
                    Some(_) => None,
                    None => Some(WalkEvent::Skipped(SkipReason::MissingBookId)),
                }
            }
            "c" => {
                self.book?;
                match first_number(el.attr("id")).filter(|n| *n >= 1) {
                    Some(n) => {
                        self.chapter = Some(n);
                        None
                    }
                    None => Some(WalkEvent::Skipped(SkipReason::BadChapterId)),
                }
            }
            "v" => Some(self.verse(el)),
            _ => None,
        }
    }

    fn verse(&self, el: &Element) -> WalkEvent {
        let (Some(book), Some(chapter)) = (self.book, self.chapter) else {
            return WalkEvent::Skipped(SkipReason::OutsideContext);
        };
        let Some(verse) = first_number(el.attr("id")).filter(|n| *n >= 1) else {
            return WalkEvent::Skipped(SkipReason::BadVerseId);
        };
        let text = element_text_content(el);
        if text.is_empty() {
            return WalkEvent::Skipped(SkipReason::EmptyText);
        }

        // USFX carries no separate display name.
        WalkEvent::Verse(VerseRecord {
            book_id: book.to_string(),
            book_display_name: book.to_string(),
            chapter,
            verse,
            text,
        })
    }
}

impl<'a> Iterator for TagStreamWalk<'a> {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        while let Some(el) = self.elements.next() {
            if let Some(event) = self.visit(el) {
                return Some(event);
            }
        }
        None
    }
}
