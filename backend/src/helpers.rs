use std::path::Path;

use anyhow::{Result, bail};

use crate::types::TranslationIdentity;
use crate::xml_document::Element;

/// Plain text of an element and everything nested in it, ignoring the markup.
///
/// Every text and tail fragment is trimmed and the fragments are joined with a
/// single space, so inline tags such as `<i>` or `<w>` don't glue words together.
pub fn element_text_content(el: &Element) -> String {
    let mut text = String::new();
    push_text_content(el, &mut text);
    text.trim().to_string()
}

fn push_text_content(el: &Element, text: &mut String) {
    if let Some(t) = el.text() {
        push_fragment(t, text);
    }
    for child in el.children() {
        push_text_content(child, text);
        if let Some(t) = child.tail() {
            push_fragment(t, text);
        }
    }
}

fn push_fragment(fragment: &str, text: &mut String) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(fragment);
}

/// The first number of an identifier that may be a range, e.g. `"9-20"` -> `9`.
///
/// Returns None for an absent or empty value, or when the part before the first
/// hyphen is not an integer.
pub fn first_number(value: Option<&str>) -> Option<i32> {
    let value = value?;
    if value.is_empty() {
        return None;
    }
    let first = value.split('-').next().unwrap_or(value);
    first.trim().parse::<i32>().ok()
}

/// The number after the last dot of a dotted identifier, e.g. `"Gen.1.3"` -> `3`.
pub fn last_dotted_number(value: Option<&str>) -> Option<i32> {
    let value = value?;
    let last = value.rsplit('.').next().unwrap_or(value);
    last.trim().parse::<i32>().ok()
}

/// A numeric attribute which counts as `0` when it is absent.
/// A value that is present but not an integer gives None.
pub fn attribute_number(value: Option<&str>) -> Option<i32> {
    match value {
        None => Some(0),
        Some(s) => s.trim().parse::<i32>().ok(),
    }
}

/// File-name language codes stored under a different `language_code`.
const LANGUAGE_CODE_OVERRIDES: [(&str, &str); 1] = [("chi", "zh-tw")];

/// Derive the translation identity from a file name like `eng-kjv.osis.xml`.
///
/// The name is cut at the first dot and split on hyphens: the first segment is
/// the language, the second is the translation identifier. The language code is
/// the language unless `LANGUAGE_CODE_OVERRIDES` maps it.
pub fn translation_identity_from_path(path: &Path) -> Result<TranslationIdentity> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let stem = filename.split('.').next().unwrap_or_default();
    let mut parts = stem.split('-');
    let lang = parts.next().unwrap_or_default();
    let trans = parts.next().unwrap_or_default();

    if lang.is_empty() || trans.is_empty() {
        bail!("File name doesn't match <language>-<translation>.<ext>: '{}'", filename);
    }

    let language_code = LANGUAGE_CODE_OVERRIDES
        .iter()
        .find(|(from, _)| *from == lang)
        .map_or(lang, |(_, to)| *to);

    Ok(TranslationIdentity {
        identifier: trans.to_string(),
        language_code: language_code.to_string(),
        display_name: format!("{} - {}", lang.to_uppercase(), trans.to_uppercase()),
        language: lang.to_string(),
        license: "Public Domain".to_string(),
    })
}
