// Byte order mark detection for corpus files.
// Some translations ship as UTF-16, everything is handed to the parser as UTF-8 with LF line endings.

use anyhow::Context;
use encoding_rs::{Encoding, UTF_16LE, UTF_16BE, UTF_8};
use std::fs;
use std::path::Path;

use crate::logger;
use crate::types::ImportError;

/// Reads an XML file, detects its encoding and returns it as UTF-8 with Unix line endings.
///
/// Bytes that are invalid in the detected encoding make the file a
/// `MalformedDocument`. A read failure is `ImportFailed`.
pub fn read_xml_file(path: &Path) -> Result<String, ImportError> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read file: {:?}", path))?;

    decode_xml_bytes(&bytes, path)
}

fn decode_xml_bytes(bytes: &[u8], path: &Path) -> Result<String, ImportError> {
    let (encoding, bom_len) = detect_encoding(bytes);

    logger::debug(&format!(
        "File: {:?}, Encoding: {}, BOM: {}",
        path.file_name().unwrap_or_default(),
        encoding.name(),
        bom_len > 0
    ));

    let decoded = encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
        .ok_or_else(|| {
            ImportError::MalformedDocument(format!(
                "Invalid {} byte sequence in {:?}",
                encoding.name(),
                path.file_name().unwrap_or_default()
            ))
        })?;

    Ok(decoded.replace("\r\n", "\n"))
}

/// Returns the encoding and the length of its BOM (0 when there is none)
fn detect_encoding(bytes: &[u8]) -> (&'static Encoding, usize) {
    match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, bom_len),
        None => (UTF_8, 0),
    }
}
