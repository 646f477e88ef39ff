//! Builder pattern for assembling a logger.
//!
//! # Example
//!
//! ```rust,no_run
//! // Console only
//! let logger = pplog::builder()
//!     .with_console(true)
//!     .with_level("Debug")
//!     .build()
//!     .expect("Failed to build logger");
//!
//! // Console and a rotating file under /var/log/app
//! let logger = pplog::builder()
//!     .with_console(true)
//!     .with_file("/var/log/app", "app.log")
//!     .with_max_size(100)
//!     .with_compress(true)
//!     .build()
//!     .expect("Failed to build logger");
//! logger.info("ready", &[]);
//! ```

use std::panic::Location;
use std::path::PathBuf;

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::anchor_for;
use crate::{Config, Logger, Result, factory};

/// A builder for configuring and constructing a [`Logger`].
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
    anchor: Option<PathBuf>,
    console_writer: Option<BoxMakeWriter>,
}

impl LoggerBuilder {
    /// Create a new LoggerBuilder with every output disabled.
    pub fn new() -> Self {
        Self::from_config(Config::new())
    }

    /// Create a LoggerBuilder from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            anchor: None,
            console_writer: None,
        }
    }

    /// Enable or disable console output.
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config = self.config.with_console(enabled);
        self
    }

    /// Enable file output into `log_dir/file_name`.
    pub fn with_file(mut self, log_dir: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.config = self.config.with_file(log_dir, file_name);
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<String>) -> Self {
        self.config = self.config.with_log_dir(log_dir);
        self
    }

    /// Set the level ("Debug", "Info", "Warn", "Error", "DPanic", "Panic", "Fatal").
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config = self.config.with_level(level);
        self
    }

    /// Size limit in megabytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.config = self.config.with_max_size(max_size);
        self
    }

    pub fn with_max_backups(mut self, max_backups: usize) -> Self {
        self.config = self.config.with_max_backups(max_backups);
        self
    }

    /// Backup retention in days.
    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.config = self.config.with_max_age(max_age);
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.config = self.config.with_compress(compress);
        self
    }

    /// Resolve relative log directories against `anchor` instead of the
    /// caller's source location.
    pub fn with_anchor(mut self, anchor: impl Into<PathBuf>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    /// Send console output to `writer` instead of stdout.
    pub fn with_console_writer<W>(mut self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.console_writer = Some(BoxMakeWriter::new(writer));
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the configuration without building.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Build the logger.
    ///
    /// # Errors
    ///
    /// Same as [`new_logger`](crate::new_logger).
    #[track_caller]
    pub fn build(self) -> Result<Logger> {
        let caller = Location::caller();
        let anchor = self.anchor.unwrap_or_else(|| anchor_for(caller.file()));
        factory::build(self.config, &anchor, self.console_writer)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
