pub mod types;
pub mod helpers;
pub mod encoding;
pub mod xml_document;
pub mod dialect;
pub mod walkers;
pub mod importer;
pub mod logger;

pub mod db;

use std::env;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::error::Error;
use app_dirs::{get_app_root, AppDataType, AppInfo};

pub use dialect::detect_dialect;
pub use importer::BibleImporter;
pub use types::{Dialect, ImportError, ImportSummary, TranslationIdentity, VerseRecord};
pub use xml_document::ParsedDocument;

/// Verses written to the sink between two commits.
pub static DEFAULT_BATCH_SIZE: usize = 1000;

pub const APP_INFO: AppInfo = AppInfo{name: "open-bibles", author: "open-bibles"};

/// Returns the data directory used for the log files.
///
/// Precedence:
/// - the OPEN_BIBLES_DIR env var
/// - the platform user data directory
pub fn get_create_open_bibles_dir() -> Result<PathBuf, Box<dyn Error>> {
    let p = match env::var("OPEN_BIBLES_DIR") {
        Ok(s) if !s.is_empty() => PathBuf::from(s),
        _ => get_app_root(AppDataType::UserData, &APP_INFO)?,
    };
    if !p.exists() {
        create_dir_all(&p)?;
    }
    Ok(p)
}
