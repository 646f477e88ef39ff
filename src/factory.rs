use std::io;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use tracing::Dispatch;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::layer::SubscriberExt;

use crate::config::{
    DEFAULT_LITE_FILE, DEFAULT_MAX_BACKUPS, DEFAULT_MAX_SIZE, LITE_MAX_AGE, anchor_for,
    resolve_log_dir,
};
use crate::format::ConsoleFormat;
use crate::{Config, Error, Level, Logger, Result, RotatingWriter, RotationPolicy, SugaredLogger};

/// Build a logger from `config`.
///
/// Zero limits and empty paths take their defaults. A relative log directory
/// that does not exist yet is resolved one level above the directory of the
/// calling source file, then created along with missing parents.
///
/// Timestamps use the local UTC offset, which can only be read while the
/// process is single threaded. Build the first logger before spawning threads,
/// otherwise records are stamped in UTC.
///
/// # Errors
///
/// - [`Error::NoSink`] when console and file output are both disabled
/// - [`Error::CreateDir`] when the log directory cannot be created
/// - [`Error::Io`] when the log file cannot be opened
#[track_caller]
pub fn new_logger(config: Config) -> Result<(Logger, SugaredLogger)> {
    let anchor = anchor_for(Location::caller().file());
    let logger = build(config, &anchor, None)?;
    let sugar = logger.sugar();
    Ok((logger, sugar))
}

/// Like [`new_logger`], but prints the error and exits the process with
/// status 1 instead of returning it.
#[track_caller]
pub fn must_new_logger(config: Config) -> (Logger, SugaredLogger) {
    match new_logger(config) {
        Ok(handles) => handles,
        Err(e) => {
            eprintln!("pplog: {}", e);
            std::process::exit(1)
        }
    }
}

/// Console and file logger with fixed rotation limits.
///
/// An empty `file_name` means `./logs/pplogger.log`. The path is used as
/// given; only its parent directories are created. Records carry their call
/// site but no stack traces.
pub fn new_logger_lite(file_name: &str, level: &str) -> Result<(Logger, SugaredLogger)> {
    let logger = build_lite(file_name, level, None)?;
    let sugar = logger.sugar();
    Ok((logger, sugar))
}

pub(crate) fn build(
    config: Config,
    anchor: &Path,
    console: Option<BoxMakeWriter>,
) -> Result<Logger> {
    let config = config.normalized();
    if !config.console && !config.file {
        return Err(Error::NoSink);
    }

    let log_dir = resolve_log_dir(&config.log_dir, anchor);
    create_log_dir(&log_dir)?;

    let file = if config.file {
        let path = log_dir.join(&config.file_name);
        let writer = RotatingWriter::new(path, RotationPolicy::from_config(&config))?;
        Some(Arc::new(writer))
    } else {
        None
    };
    let console = config
        .console
        .then(|| console.unwrap_or_else(|| BoxMakeWriter::new(io::stdout)));

    assemble(config.effective_level(), console, file, ConsoleFormat::new())
}

pub(crate) fn build_lite(
    file_name: &str,
    level: &str,
    console: Option<BoxMakeWriter>,
) -> Result<Logger> {
    let path = if file_name.is_empty() {
        DEFAULT_LITE_FILE
    } else {
        file_name
    };
    let policy = RotationPolicy::new(DEFAULT_MAX_SIZE, DEFAULT_MAX_BACKUPS, LITE_MAX_AGE);
    let file = Arc::new(RotatingWriter::new(path, policy)?);
    let console = console.unwrap_or_else(|| BoxMakeWriter::new(io::stdout));

    assemble(
        Level::parse(level),
        Some(console),
        Some(file),
        ConsoleFormat::new().with_stacktrace(None),
    )
}

/// Wire the sinks into a dispatcher. Every record is written to each sink in
/// turn on the logging thread.
pub(crate) fn assemble(
    level: Level,
    console: Option<BoxMakeWriter>,
    file: Option<Arc<RotatingWriter>>,
    format: ConsoleFormat,
) -> Result<Logger> {
    let writer = match (console, file.clone()) {
        (Some(console), Some(file)) => BoxMakeWriter::new(console.and(file)),
        (Some(console), None) => console,
        (None, Some(file)) => BoxMakeWriter::new(file),
        (None, None) => return Err(Error::NoSink),
    };

    let layer = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(writer)
        .with_filter(level.to_level_filter());
    let subscriber = tracing_subscriber::registry().with(layer);

    Ok(Logger::new(Dispatch::new(subscriber), level, file))
}

fn create_log_dir(path: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }
    builder.create(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
