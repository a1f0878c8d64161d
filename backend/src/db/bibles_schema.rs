// Mirrors migrations/2026-10-16-000000_create_tables/up.sql

diesel::table! {
    translations (id) {
        id -> Integer,
        identifier -> Text,
        language -> Text,
        name -> Text,
        language_code -> Text,
        license -> Nullable<Text>,
    }
}

diesel::table! {
    verses (id) {
        id -> Integer,
        translation_id -> Integer,
        book_id -> Text,
        book -> Text,
        chapter -> Integer,
        verse -> Integer,
        text -> Text,
    }
}

diesel::joinable!(verses -> translations (translation_id));

diesel::allow_tables_to_appear_in_same_query!(
    translations,
    verses,
);
