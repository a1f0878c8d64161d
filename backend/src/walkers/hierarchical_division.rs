//! OSIS walker
//!
//! `<div type="book" osisID="Gen">` contains `<chapter osisID="Gen.1">`, which
//! contains `<verse osisID="Gen.1.1">`. Elements are matched by local name in any
//! namespace, at any depth below their container.

use std::iter;

use crate::helpers::{element_text_content, last_dotted_number};
use crate::types::{SkipReason, VerseRecord, WalkEvent};
use crate::xml_document::{Element, ParsedDocument};

use super::{VerseWalker, WalkEvents};

pub struct HierarchicalDivisionWalker;

impl VerseWalker for HierarchicalDivisionWalker {
    fn walk<'a>(&self, doc: &'a ParsedDocument) -> WalkEvents<'a> {
        Box::new(
            doc.root()
                .descendants()
                .filter(|el| el.name() == "div" && el.attr("type") == Some("book"))
                .flat_map(walk_book),
        )
    }
}

fn walk_book(book: &Element) -> WalkEvents<'_> {
    let Some(book_id) = book.attr("osisID").filter(|id| !id.is_empty()) else {
        return Box::new(iter::once(WalkEvent::Skipped(SkipReason::MissingBookId)));
    };

    Box::new(
        book.descendants()
            .filter(|el| el.name() == "chapter")
            .flat_map(move |chapter| walk_chapter(book_id, chapter)),
    )
}

fn walk_chapter<'a>(book_id: &'a str, chapter: &'a Element) -> WalkEvents<'a> {
    let Some(chapter_num) = last_dotted_number(chapter.attr("osisID")).filter(|n| *n >= 1) else {
        return Box::new(iter::once(WalkEvent::Skipped(SkipReason::BadChapterId)));
    };

    Box::new(
        chapter.descendants()
            .filter(|el| el.name() == "verse")
            .map(move |verse| verse_event(book_id, chapter_num, verse)),
    )
}

fn verse_event(book_id: &str, chapter: i32, el: &Element) -> WalkEvent {
    let Some(verse) = last_dotted_number(el.attr("osisID")).filter(|n| *n >= 1) else {
        return WalkEvent::Skipped(SkipReason::BadVerseId);
    };
    let text = element_text_content(el);
    if text.is_empty() {
        return WalkEvent::Skipped(SkipReason::EmptyText);
    }

    WalkEvent::Verse(VerseRecord {
        book_id: book_id.to_string(),
        book_display_name: book_id.to_string(),
        chapter,
        verse,
        text,
    })
}
