//! Dialect detection from the document root
//!
//! The three schema families have unrelated root elements, so the root tag alone
//! decides which walker reads the document.

use crate::types::{Dialect, ImportError};
use crate::xml_document::ParsedDocument;

const USFX_ROOT: &str = "usfx";
const OSIS_MARKER: &str = "osis";
const ZEFANIA_ROOT: &str = "XMLBIBLE";

/// Select the dialect of a parsed document.
///
/// Rules, first match wins:
/// 1. root tag is `usfx` → TagStream
/// 2. root tag (lowercased) contains `osis` → HierarchicalDivision
/// 3. root tag is `XMLBIBLE` → AttributeBased
///
/// The root tag is in Clark notation, so a namespaced OSIS root such as
/// `{http://www.bibletechnologies.net/2003/OSIS/namespace}osis` also matches rule 2.
///
/// # Errors
/// `UnrecognizedDialect` with the root tag when no rule matches.
pub fn detect_dialect(doc: &ParsedDocument) -> Result<Dialect, ImportError> {
    let tag = doc.root().tag();

    if tag == USFX_ROOT {
        Ok(Dialect::TagStream)
    } else if tag.to_lowercase().contains(OSIS_MARKER) {
        Ok(Dialect::HierarchicalDivision)
    } else if tag == ZEFANIA_ROOT {
        Ok(Dialect::AttributeBased)
    } else {
        Err(ImportError::UnrecognizedDialect { root_tag: tag })
    }
}
