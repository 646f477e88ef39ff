//! Logger handles.
//!
//! [`Logger`] takes a message plus typed [`Field`]s. [`SugaredLogger`] wraps
//! the same logger with printf-style (`infof`) and loose key-value (`infow`)
//! calls. Both record the call site of the logging call through
//! `#[track_caller]`.

use std::fmt;
use std::io;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::Dispatch;

use crate::format::short_caller;
use crate::{Error, Level, Result, RotatingWriter};

/// A key-value pair attached to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    value: String,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }

    /// Duration rendered human-readable, e.g. `1.5s` or `250ms`.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, format_args!("{:?}", value))
    }

    /// The error under the `error` key.
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::new("error", err)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs_quotes = self.value.is_empty()
            || self
                .value
                .chars()
                .any(|c| c.is_whitespace() || c == '=' || c == '"');
        if needs_quotes {
            write!(f, "{}={:?}", self.key, self.value)
        } else {
            write!(f, "{}={}", self.key, self.value)
        }
    }
}

/// Shorthand for [`Field::new`].
pub fn field(key: impl Into<String>, value: impl fmt::Display) -> Field {
    Field::new(key, value)
}

fn render_fields<'a>(fields: impl IntoIterator<Item = &'a Field>) -> String {
    let mut rendered = String::new();
    for field in fields {
        if !rendered.is_empty() {
            rendered.push(' ');
        }
        rendered.push_str(&field.to_string());
    }
    rendered
}

/// Leveled, structured logger.
///
/// Cloning is cheap; clones share sinks.
#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
    level: Level,
    name: String,
    context: Vec<Field>,
    file: Option<Arc<RotatingWriter>>,
}

impl Logger {
    pub(crate) fn new(dispatch: Dispatch, level: Level, file: Option<Arc<RotatingWriter>>) -> Self {
        Self {
            dispatch,
            level,
            name: String::new(),
            context: Vec::new(),
            file,
        }
    }

    /// Threshold below which records are dropped.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child logger whose name gets `name` appended, dot-separated.
    pub fn named(&self, name: &str) -> Logger {
        let mut child = self.clone();
        if name.is_empty() {
            return child;
        }
        child.name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.name, name)
        };
        child
    }

    /// Child logger that adds `fields` to every record.
    pub fn with(&self, fields: impl IntoIterator<Item = Field>) -> Logger {
        let mut child = self.clone();
        child.context.extend(fields);
        child
    }

    /// Path of the active log file, if file output is enabled.
    pub fn log_file(&self) -> Option<&Path> {
        self.file.as_deref().map(RotatingWriter::path)
    }

    /// Companion handle with printf-style and key-value calls.
    pub fn sugar(&self) -> SugaredLogger {
        SugaredLogger { base: self.clone() }
    }

    /// Dispatcher that renders this logger's records.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `f` with this logger as the thread's default, so plain `tracing`
    /// macros inside it are rendered by this logger.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Install this logger as the process-wide `tracing` default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] when a global default is already set.
    pub fn init_global(&self) -> Result<()> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| Error::Init(e.to_string()))
    }

    /// Flush the log file to disk.
    pub fn sync(&self) -> io::Result<()> {
        match &self.file {
            Some(file) => file.sync(),
            None => Ok(()),
        }
    }

    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, fields: &[Field]) {
        self.emit(level, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, fields: &[Field]) {
        self.emit(Level::Debug, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, fields: &[Field]) {
        self.emit(Level::Info, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, fields: &[Field]) {
        self.emit(Level::Warn, Location::caller(), msg, fields);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, fields: &[Field]) {
        self.emit(Level::Error, Location::caller(), msg, fields);
    }

    /// Logged like `error`; never panics.
    #[track_caller]
    pub fn dpanic(&self, msg: &str, fields: &[Field]) {
        self.emit(Level::DPanic, Location::caller(), msg, fields);
    }

    /// Write the record, then panic with `msg`.
    ///
    /// The panic happens even when `Panic` is below the threshold.
    #[track_caller]
    pub fn panic(&self, msg: &str, fields: &[Field]) -> ! {
        self.emit(Level::Panic, Location::caller(), msg, fields);
        panic!("{}", msg)
    }

    /// Write the record, flush, then exit the process with status 1.
    #[track_caller]
    pub fn fatal(&self, msg: &str, fields: &[Field]) -> ! {
        self.emit(Level::Fatal, Location::caller(), msg, fields);
        let _ = self.sync();
        std::process::exit(1)
    }

    fn emit(&self, level: Level, caller: &Location<'_>, msg: &str, fields: &[Field]) {
        if !self.enabled(level) {
            return;
        }

        let severity = level.as_str();
        let name = self.name.as_str();
        let caller = short_caller(caller.file(), caller.line());
        let rendered = render_fields(self.context.iter().chain(fields));

        // Event levels must be constants, hence one callsite per tracing level.
        macro_rules! event_at {
            ($lvl:expr) => {
                tracing::event!(
                    $lvl,
                    logger.severity = severity,
                    logger.name = name,
                    logger.caller = caller.as_str(),
                    logger.fields = rendered.as_str(),
                    "{}",
                    msg
                )
            };
        }

        tracing::dispatcher::with_default(&self.dispatch, || match level.to_tracing() {
            tracing::Level::DEBUG => event_at!(tracing::Level::DEBUG),
            tracing::Level::INFO => event_at!(tracing::Level::INFO),
            tracing::Level::WARN => event_at!(tracing::Level::WARN),
            _ => event_at!(tracing::Level::ERROR),
        });
    }
}

fn pairs_to_fields(keys_and_values: &[(&str, &dyn fmt::Display)]) -> Vec<Field> {
    keys_and_values
        .iter()
        .map(|(key, value)| Field::new(*key, value))
        .collect()
}

/// Printf-style and key-value front end over a [`Logger`].
///
/// ```rust,no_run
/// # let (_, sugar) = pplog::new_logger(pplog::Config::new().with_console(true))?;
/// sugar.infof(format_args!("served {} requests", 12));
/// sugar.infow("request served", &[("path", &"/health"), ("status", &200)]);
/// # Ok::<(), pplog::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct SugaredLogger {
    base: Logger,
}

macro_rules! sugared_levels {
    ($($level:expr => $plain:ident, $printf:ident, $kv:ident;)*) => {
        $(
            #[track_caller]
            pub fn $plain(&self, msg: impl fmt::Display) {
                if self.base.enabled($level) {
                    self.base.emit($level, Location::caller(), &msg.to_string(), &[]);
                }
            }

            #[track_caller]
            pub fn $printf(&self, args: fmt::Arguments<'_>) {
                if self.base.enabled($level) {
                    self.base.emit($level, Location::caller(), &args.to_string(), &[]);
                }
            }

            #[track_caller]
            pub fn $kv(&self, msg: &str, keys_and_values: &[(&str, &dyn fmt::Display)]) {
                if self.base.enabled($level) {
                    let fields = pairs_to_fields(keys_and_values);
                    self.base.emit($level, Location::caller(), msg, &fields);
                }
            }
        )*
    };
}

impl SugaredLogger {
    /// The structured logger underneath.
    pub fn desugar(&self) -> Logger {
        self.base.clone()
    }

    pub fn named(&self, name: &str) -> SugaredLogger {
        self.base.named(name).sugar()
    }

    /// Child logger that adds the given pairs to every record.
    pub fn with(&self, keys_and_values: &[(&str, &dyn fmt::Display)]) -> SugaredLogger {
        self.base.with(pairs_to_fields(keys_and_values)).sugar()
    }

    pub fn sync(&self) -> io::Result<()> {
        self.base.sync()
    }

    sugared_levels! {
        Level::Debug => debug, debugf, debugw;
        Level::Info => info, infof, infow;
        Level::Warn => warn, warnf, warnw;
        Level::Error => error, errorf, errorw;
        Level::DPanic => dpanic, dpanicf, dpanicw;
    }

    #[track_caller]
    pub fn panic(&self, msg: impl fmt::Display) -> ! {
        self.base.panic(&msg.to_string(), &[])
    }

    #[track_caller]
    pub fn panicf(&self, args: fmt::Arguments<'_>) -> ! {
        self.base.panic(&args.to_string(), &[])
    }

    #[track_caller]
    pub fn panicw(&self, msg: &str, keys_and_values: &[(&str, &dyn fmt::Display)]) -> ! {
        self.base.panic(msg, &pairs_to_fields(keys_and_values))
    }

    #[track_caller]
    pub fn fatal(&self, msg: impl fmt::Display) -> ! {
        self.base.fatal(&msg.to_string(), &[])
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) -> ! {
        self.base.fatal(&args.to_string(), &[])
    }

    #[track_caller]
    pub fn fatalw(&self, msg: &str, keys_and_values: &[(&str, &dyn fmt::Display)]) -> ! {
        self.base.fatal(msg, &pairs_to_fields(keys_and_values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ConsoleFormat;
    use crate::test_support::Capture;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;

    fn capture_logger(level: Level) -> (Logger, Capture) {
        let capture = Capture::default();
        let logger = crate::factory::assemble(
            level,
            Some(BoxMakeWriter::new(capture.clone())),
            None,
            ConsoleFormat::new().with_stacktrace(None),
        )
        .unwrap();
        (logger, capture)
    }

    fn columns(line: &str) -> Vec<String> {
        line.split('\t').map(str::to_string).collect()
    }

    #[test]
    fn test_field_display() {
        assert_eq!(field("port", 80).to_string(), "port=80");
        assert_eq!(field("path", "a b").to_string(), "path=\"a b\"");
        assert_eq!(field("empty", "").to_string(), "empty=\"\"");
        assert_eq!(
            Field::duration("took", Duration::from_millis(1500)).to_string(),
            "took=1.5s"
        );
        let err = io::Error::other("disk-full");
        assert_eq!(Field::error(&err).to_string(), "error=disk-full");
    }

    #[test]
    fn test_info_record() {
        let (logger, capture) = capture_logger(Level::Info);
        logger.info("started", &[field("port", 8080)]);
        let line = line!() - 1;

        let output = capture.contents();
        let cols = columns(output.trim_end());
        assert_eq!(cols.len(), 5, "{:?}", cols);
        assert_eq!(cols[1], "INFO");
        assert_eq!(cols[2], format!("src/logger.rs:{}", line));
        assert_eq!(cols[3], "started");
        assert_eq!(cols[4], "port=8080");
    }

    #[test]
    fn test_threshold_drops_lower_levels() {
        let (logger, capture) = capture_logger(Level::Warn);
        logger.debug("hidden", &[]);
        logger.info("hidden", &[]);
        logger.warn("shown", &[]);
        logger.dpanic("shown too", &[]);

        let output = capture.contents();
        let levels: Vec<String> = output.lines().map(|l| columns(l)[1].clone()).collect();
        assert_eq!(levels, ["WARN", "DPANIC"]);
    }

    #[test]
    fn test_severity_above_error_is_filtered_by_logger() {
        let (logger, capture) = capture_logger(Level::Panic);
        logger.error("hidden", &[]);
        logger.dpanic("hidden", &[]);
        assert_eq!(capture.contents(), "");
    }

    #[test]
    fn test_named_and_with() {
        let (logger, capture) = capture_logger(Level::Info);
        let child = logger
            .named("db")
            .named("pool")
            .with([field("shard", 3)]);
        assert_eq!(child.name(), "db.pool");
        child.info("checkout", &[field("wait", "2ms")]);

        let cols = columns(capture.contents().trim_end());
        assert_eq!(cols[2], "db.pool");
        assert_eq!(cols[4], "checkout");
        assert_eq!(cols[5], "shard=3 wait=2ms");
        assert_eq!(logger.name(), "");
    }

    #[test]
    #[should_panic(expected = "invariant broken")]
    fn test_panic_logs_then_panics() {
        let (logger, _capture) = capture_logger(Level::Info);
        logger.panic("invariant broken", &[]);
    }

    #[test]
    fn test_panic_record_written() {
        let (logger, capture) = capture_logger(Level::Info);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.panic("boom", &[field("code", 7)]);
        }));
        assert!(result.is_err());
        let cols = columns(capture.contents().trim_end());
        assert_eq!(cols[1], "PANIC");
        assert_eq!(cols[3], "boom");
    }

    #[test]
    fn test_sugared_calls() {
        let (logger, capture) = capture_logger(Level::Debug);
        let sugar = logger.sugar().named("api");
        sugar.debug("plain");
        sugar.infof(format_args!("served {} requests", 12));
        sugar.warnw("slow", &[("path", &"/health"), ("ms", &250)]);
        sugar
            .with(&[("req", &"r-1")])
            .errorw("failed", &[("status", &500)]);

        let output = capture.contents();
        let rows: Vec<Vec<String>> = output.lines().map(columns).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][1], "DEBUG");
        assert_eq!(rows[0][4], "plain");
        assert_eq!(rows[1][4], "served 12 requests");
        assert_eq!(rows[2][5], "path=/health ms=250");
        assert_eq!(rows[3][1], "ERROR");
        assert_eq!(rows[3][5], "req=r-1 status=500");
        assert!(rows.iter().all(|r| r[2] == "api"));
        assert!(rows.iter().all(|r| r[3].starts_with("src/logger.rs:")));
    }

    #[test]
    fn test_in_scope_routes_tracing_macros() {
        let (logger, capture) = capture_logger(Level::Info);
        logger.in_scope(|| {
            tracing::debug!("dropped");
            tracing::info!(user = "bob", "through tracing");
        });

        let output = capture.contents();
        assert_eq!(output.lines().count(), 1);
        let cols = columns(output.trim_end());
        assert_eq!(cols[1], "INFO");
        assert_eq!(cols[3], "through tracing");
        assert_eq!(cols[4], "user=bob");
    }

    #[test]
    fn test_console_only_logger_has_no_file() {
        let (logger, _capture) = capture_logger(Level::Info);
        assert!(logger.log_file().is_none());
        assert!(logger.sync().is_ok());
    }
}
