use std::fs;
use std::path::{Path, PathBuf};

use open_bibles_backend::db::{self, SqliteSink};

pub fn test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

pub fn fixture(name: &str) -> PathBuf {
    test_data_dir().join(name)
}

/// A fresh in-memory database with the tables created.
pub fn memory_sink() -> SqliteSink {
    let mut conn = db::establish_connection(":memory:").expect("Can't connect");
    db::run_migrations(&mut conn).expect("Can't migrate");
    SqliteSink::new(conn)
}

/// Copy the fixtures into a temporary bibles directory.
#[allow(dead_code)]
pub fn bibles_dir_with(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Can't create temp dir");
    for name in names {
        fs::copy(fixture(name), dir.path().join(name)).expect("Can't copy fixture");
    }
    dir
}

#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Can't write file");
    path
}
