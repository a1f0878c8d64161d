//! Import log
//!
//! Messages go to `log.txt` in the data directory, and to the console through
//! `tracing` when `ENABLE_PRINT_LOG=true`. The previous `log.txt` is renamed with
//! its modification time on startup, and only the newest few of those are kept.
//!
//! Environment:
//! - `LOG_LEVEL`: silent, error, warn, info (default) or debug
//! - `DISABLE_LOG=true`: don't write the log file
//! - `ENABLE_PRINT_LOG=true`: also print to stderr
//! - `RUST_LOG`: filter for the console output, default `info`

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tracing_subscriber::EnvFilter;

use crate::get_create_open_bibles_dir;

const LOG_FILE_NAME: &str = "log.txt";
const KEEP_OLD_LOGS: usize = 5;

/// Verbosity, each level includes the ones below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    /// Also reports every skipped verse element.
    Debug = 4,
}

impl Level {
    fn from_u8(n: u8) -> Level {
        match n {
            0 => Level::Silent,
            1 => Level::Error,
            2 => Level::Warn,
            3 => Level::Info,
            _ => Level::Debug,
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(Level::Silent),
            "error" => Ok(Level::Error),
            "warn" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Silent => "SILENT",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        };
        f.write_str(s)
    }
}

fn env_is_true(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Rename `log.txt` to `log.<modified time>.txt` and delete all but the newest
/// `keep` renamed logs.
fn rotate_logs(dir: &Path, keep: usize) -> std::io::Result<()> {
    let current = dir.join(LOG_FILE_NAME);
    if current.is_file() {
        let modified: DateTime<Local> = fs::metadata(&current)?.modified()?.into();
        let archived = dir.join(format!("log.{}.txt", modified.format("%Y-%m-%dT%H-%M-%S")));
        fs::rename(&current, archived)?;
    }

    let mut archived: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n != LOG_FILE_NAME && n.starts_with("log.") && n.ends_with(".txt"))
        })
        .collect();

    // Timestamped names sort oldest first
    archived.sort();
    let excess = archived.len().saturating_sub(keep);
    for old in archived.into_iter().take(excess) {
        fs::remove_file(&old)?;
    }
    Ok(())
}

pub struct Logger {
    file: Mutex<Option<File>>,
    print: bool,
    level: AtomicU8,
}

impl Logger {
    /// A logger writing to `dir/log.txt`, configured from the environment.
    pub fn in_dir(dir: &Path) -> std::io::Result<Self> {
        let file = if env_is_true("DISABLE_LOG") {
            None
        } else {
            fs::create_dir_all(dir)?;
            if let Err(e) = rotate_logs(dir, KEEP_OLD_LOGS) {
                eprintln!("Failed to rotate log files: {}", e);
            }
            Some(OpenOptions::new().create(true).append(true).open(dir.join(LOG_FILE_NAME))?)
        };

        let level = std::env::var("LOG_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Level::Info);

        Ok(Logger {
            file: Mutex::new(file),
            print: env_is_true("ENABLE_PRINT_LOG"),
            level: AtomicU8::new(level as u8),
        })
    }

    fn console_only() -> Self {
        Logger {
            file: Mutex::new(None),
            print: env_is_true("ENABLE_PRINT_LOG"),
            level: AtomicU8::new(Level::Info as u8),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn log(&self, level: Level, msg: &str) {
        if level == Level::Silent || level > self.level() {
            return;
        }

        if self.print {
            match level {
                Level::Error => tracing::error!("{}", msg),
                Level::Warn => tracing::warn!("{}", msg),
                Level::Info => tracing::info!("{}", msg),
                _ => tracing::debug!("{}", msg),
            }
        }

        if let Ok(mut guard) = self.file.lock()
            && let Some(file) = guard.as_mut()
        {
            let line = format!("[{}] {}: {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S%.3fZ"), level, msg);
            if let Err(e) = file.write_all(line.as_bytes()) {
                eprintln!("Failed to write to log file: {}", e);
            }
        }
    }
}

/// Console output for `tracing` events, on stderr so stdout stays clean for `--json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let res = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(e) = res {
        eprintln!("Failed to initialize tracing: {}", e);
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| {
        init_tracing();
        let dir = match get_create_open_bibles_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("Failed to get data dir, logging to console only: {}", e);
                return Logger::console_only();
            }
        };
        Logger::in_dir(&dir).unwrap_or_else(|e| {
            eprintln!("Failed to open log file in {:?}: {}", dir, e);
            Logger::console_only()
        })
    })
}

pub fn error(msg: &str) {
    logger().log(Level::Error, msg);
}

pub fn warn(msg: &str) {
    logger().log(Level::Warn, msg);
}

pub fn info(msg: &str) {
    logger().log(Level::Info, msg);
}

pub fn debug(msg: &str) {
    logger().log(Level::Debug, msg);
}

pub fn set_log_level(level: Level) {
    logger().set_level(level);
}

/// `hh:mm:ss`, for reporting how long an import took.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str() {
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!(" silent ".parse::<Level>(), Ok(Level::Silent));
        assert!("verbose".parse::<Level>().is_err());
        assert!(Level::Debug > Level::Info);
        assert_eq!(Level::from_u8(Level::Warn as u8), Level::Warn);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_duration(Duration::from_millis(999)), "00:00:00");
    }

    #[test]
    fn test_rotate_logs_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=7 {
            fs::write(dir.path().join(format!("log.2020-01-0{}T00-00-00.txt", day)), "").unwrap();
        }
        fs::write(dir.path().join(LOG_FILE_NAME), "current").unwrap();

        rotate_logs(dir.path(), KEEP_OLD_LOGS).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names.len(), 5);
        assert!(!names.contains(&LOG_FILE_NAME.to_string()));
        assert_eq!(names[0], "log.2020-01-04T00-00-00.txt");
    }

    #[test]
    fn test_log_respects_level() {
        let dir = tempfile::tempdir().unwrap();
        let file = fs::File::create(dir.path().join(LOG_FILE_NAME)).unwrap();
        let logger = Logger {
            file: Mutex::new(Some(file)),
            print: false,
            level: AtomicU8::new(Level::Warn as u8),
        };

        logger.log(Level::Info, "not written");
        logger.log(Level::Error, "written");
        logger.set_level(Level::Debug);
        logger.log(Level::Debug, "also written");

        let content = fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
        assert!(!content.contains("not written"));
        assert!(content.contains("ERROR: written"));
        assert!(content.contains("DEBUG: also written"));
    }
}
