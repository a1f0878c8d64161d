use diesel::prelude::*;

use crate::db::bibles_schema::*;
use crate::types::{TranslationIdentity, VerseRecord};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = translations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Translation {
    pub id: i32,
    pub identifier: String,
    pub language: String,
    pub name: String,
    pub language_code: String,
    pub license: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = translations)]
pub struct NewTranslation<'a> {
    pub identifier: &'a str,
    pub language: &'a str,
    pub name: &'a str,
    pub language_code: &'a str,
    pub license: Option<&'a str>,
}

impl<'a> From<&'a TranslationIdentity> for NewTranslation<'a> {
    fn from(t: &'a TranslationIdentity) -> Self {
        NewTranslation {
            identifier: &t.identifier,
            language: &t.language,
            name: &t.display_name,
            language_code: &t.language_code,
            license: Some(&t.license),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq, Associations)]
#[diesel(belongs_to(Translation, foreign_key = translation_id))]
#[diesel(table_name = verses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Verse {
    pub id: i32,
    pub translation_id: i32,
    pub book_id: String,
    pub book: String,
    pub chapter: i32,
    pub verse: i32,
    pub text: String,
}

#[derive(Insertable)]
#[diesel(table_name = verses)]
pub struct NewVerse<'a> {
    pub translation_id: i32,
    pub book_id: &'a str,
    pub book: &'a str,
    pub chapter: i32,
    pub verse: i32,
    pub text: &'a str,
}

impl<'a> NewVerse<'a> {
    pub fn from_record(translation_id: i32, v: &'a VerseRecord) -> Self {
        NewVerse {
            translation_id,
            book_id: &v.book_id,
            book: &v.book_display_name,
            chapter: v.chapter,
            verse: v.verse,
            text: &v.text,
        }
    }
}
