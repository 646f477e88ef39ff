use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Level;

/// Fallback for a zero `max_size`, in megabytes.
pub const DEFAULT_MAX_SIZE: u64 = 500;
/// Fallback for a zero `max_backups`.
pub const DEFAULT_MAX_BACKUPS: usize = 3;
/// Fallback for a zero `max_age`, in days.
pub const DEFAULT_MAX_AGE: u64 = 30;
/// Retention used by the lite constructor, in days.
pub const LITE_MAX_AGE: u64 = 28;
/// Directory used when `log_dir` is empty or `./`.
pub const DEFAULT_LOG_DIR: &str = "./logs";
/// File name used when file output is enabled without a name.
pub const DEFAULT_FILE_NAME: &str = "pplogger.log";
/// File path used by the lite constructor when none is given.
pub const DEFAULT_LITE_FILE: &str = "./logs/pplogger.log";

/// Configuration for a logger
///
/// Every field is optional when deserializing; zero limits and empty strings
/// are replaced by defaults when the logger is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Write records to standard output
    pub console: bool,
    /// Write records to a rotating file
    pub file: bool,
    /// Directory holding the log file
    pub log_dir: String,
    /// Name of the log file inside `log_dir`
    pub file_name: String,
    /// Level name ("Debug", "Info", "Warn", "Error", "DPanic", "Panic", "Fatal")
    pub level: String,
    /// Maximum size of the active file in megabytes
    pub max_size: u64,
    /// Maximum number of rotated files to keep
    pub max_backups: usize,
    /// Maximum age of rotated files in days
    pub max_age: u64,
    /// Gzip rotated files
    pub compress: bool,
}

impl Config {
    /// Create a new Config with every output disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable console logging
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Enable file logging into `log_dir/file_name`
    pub fn with_file(mut self, log_dir: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.file = true;
        self.log_dir = log_dir.into();
        self.file_name = file_name.into();
        self
    }

    /// Set the log directory without enabling file output
    pub fn with_log_dir(mut self, log_dir: impl Into<String>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Set log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Set the size limit in megabytes
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the number of rotated files to keep
    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.max_backups = max_backups;
        self
    }

    /// Set the retention of rotated files in days
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = max_age;
        self
    }

    /// Gzip rotated files
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Effective threshold for this configuration.
    pub fn effective_level(&self) -> Level {
        Level::parse(&self.level)
    }

    /// Replace zero limits and empty paths with their defaults.
    pub fn normalized(mut self) -> Self {
        if self.max_size == 0 {
            self.max_size = DEFAULT_MAX_SIZE;
        }
        if self.max_backups == 0 {
            self.max_backups = DEFAULT_MAX_BACKUPS;
        }
        if self.max_age == 0 {
            self.max_age = DEFAULT_MAX_AGE;
        }
        if self.log_dir.is_empty() || self.log_dir == "./" {
            self.log_dir = DEFAULT_LOG_DIR.to_string();
        }
        if self.file_name.is_empty() {
            self.file_name = DEFAULT_FILE_NAME.to_string();
        }
        self
    }
}

/// Resolve the log directory the way the factory creates it.
///
/// An existing or absolute directory is returned as is. Otherwise the path is
/// taken relative to `anchor`.
pub fn resolve_log_dir(log_dir: &str, anchor: &Path) -> PathBuf {
    let path = Path::new(log_dir);
    if path.exists() || is_absolute(log_dir) {
        return path.to_path_buf();
    }
    anchor.join(path)
}

/// Anchor for relative log directories: one level above the directory of
/// `source_file`.
pub fn anchor_for(source_file: &str) -> PathBuf {
    let dir = Path::new(source_file).parent().unwrap_or(Path::new(""));
    dir.join("..")
}

/// Unix roots and Windows drive prefixes count as absolute on every platform.
fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') || Path::new(path).is_absolute() {
        return true;
    }
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\'
}
