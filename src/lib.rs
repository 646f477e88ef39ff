//! # pplog
//!
//! Structured logger factory on top of `tracing`.
//!
//! ## Features
//!
//! - Console and/or file output, written synchronously to every sink
//! - Size-based rotation with backup count and age limits, optional gzip
//! - Console-style records with timestamp, level, logger name, call site and
//!   stack traces for `Error` and above
//! - Structured (`Logger`) and printf/key-value (`SugaredLogger`) handles
//!
//! ## Example
//!
//! ```rust,no_run
//! use pplog::{Config, field, new_logger};
//!
//! let config = Config::new()
//!     .with_console(true)
//!     .with_file("./logs", "app.log")
//!     .with_level("Debug");
//! let (logger, sugar) = new_logger(config)?;
//!
//! logger.info("listening", &[field("port", 8080)]);
//! sugar.warnf(format_args!("{} slow requests", 3));
//! # Ok::<(), pplog::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod factory;
pub mod format;
pub mod level;
pub mod logger;
pub mod rotation;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use builder::LoggerBuilder;
pub use config::Config;
pub use error::{Error, Result};
pub use factory::{must_new_logger, new_logger, new_logger_lite};
pub use format::{ConsoleFormat, EncoderKeys};
pub use level::Level;
pub use logger::{Field, Logger, SugaredLogger, field};
pub use rotation::RotationPolicy;
pub use writer::RotatingWriter;

/// Start a [`LoggerBuilder`].
pub fn builder() -> LoggerBuilder {
    LoggerBuilder::new()
}
