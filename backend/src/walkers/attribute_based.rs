//! Zefania walker
//!
//! `<BIBLEBOOK bnumber="1" bname="Genesis">` / `<CHAPTER cnumber="1">` /
//! `<VERSE vnumber="1">`. Unlike the other dialects, a missing chapter or verse
//! number counts as 0 and the verse is still emitted.

use std::iter;

use crate::helpers::{attribute_number, element_text_content};
use crate::types::{SkipReason, VerseRecord, WalkEvent};
use crate::xml_document::{Element, ParsedDocument};

use super::{VerseWalker, WalkEvents};

pub struct AttributeBasedWalker;

impl VerseWalker for AttributeBasedWalker {
    fn walk<'a>(&self, doc: &'a ParsedDocument) -> WalkEvents<'a> {
        Box::new(
            doc.root()
                .descendants()
                .filter(|el| el.name() == "BIBLEBOOK")
                .flat_map(walk_book),
        )
    }
}

fn walk_book(book: &Element) -> WalkEvents<'_> {
    let book_id = book.attr("bnumber").filter(|s| !s.is_empty());
    let book_name = book.attr("bname").filter(|s| !s.is_empty());
    let (Some(book_id), Some(book_name)) = (book_id, book_name) else {
        return Box::new(iter::once(WalkEvent::Skipped(SkipReason::MissingBookId)));
    };

    Box::new(
        book.descendants()
            .filter(|el| el.name() == "CHAPTER")
            .flat_map(move |chapter| walk_chapter(book_id, book_name, chapter)),
    )
}

fn walk_chapter<'a>(book_id: &'a str, book_name: &'a str, chapter: &'a Element) -> WalkEvents<'a> {
    let Some(chapter_num) = attribute_number(chapter.attr("cnumber")) else {
        return Box::new(iter::once(WalkEvent::Skipped(SkipReason::BadChapterId)));
    };

    Box::new(
        chapter.descendants()
            .filter(|el| el.name() == "VERSE")
            .map(move |verse| verse_event(book_id, book_name, chapter_num, verse)),
    )
}

fn verse_event(book_id: &str, book_name: &str, chapter: i32, el: &Element) -> WalkEvent {
    let Some(verse) = attribute_number(el.attr("vnumber")) else {
        return WalkEvent::Skipped(SkipReason::BadVerseId);
    };
    let text = element_text_content(el);
    if text.is_empty() {
        return WalkEvent::Skipped(SkipReason::EmptyText);
    }

    WalkEvent::Verse(VerseRecord {
        book_id: book_id.to_string(),
        book_display_name: book_name.to_string(),
        chapter,
        verse,
        text,
    })
}
