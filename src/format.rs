//! Console-style record layout.
//!
//! A record is one tab-separated line, followed by a stack trace on the next
//! lines for severe records:
//!
//! ```text
//! 2026-01-09 14:03:07.120	INFO	api	src/server.rs:42	listening	port=8080
//! ```
//!
//! Elements appear in key order (time, level, name, caller, message, fields).
//! A name or caller that is missing is skipped, and so is any element whose
//! key is empty.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::{self, Write as _};
use std::sync::OnceLock;

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::registry::LookupSpan;

use crate::Level;

pub(crate) const SEVERITY_FIELD: &str = "logger.severity";
pub(crate) const NAME_FIELD: &str = "logger.name";
pub(crate) const CALLER_FIELD: &str = "logger.caller";
pub(crate) const FIELDS_FIELD: &str = "logger.fields";

/// Leading stack frames that belong to the capture and dispatch machinery
/// rather than to the code that logged.
const INTERNAL_FRAMES: &[&str] = &[
    "std::backtrace",
    "<std::backtrace",
    "std::sys::",
    "std::thread::local::",
    "<std::thread::local::",
    "core::ops::function::",
    "<core::ops::function::",
    "pplog::format::ConsoleFormat",
    "<pplog::format::ConsoleFormat",
    "pplog::logger::Logger",
    "<pplog::logger::Logger",
    "pplog::logger::SugaredLogger",
    "<pplog::logger::SugaredLogger",
    "tracing::",
    "<tracing::",
    "tracing_core::",
    "<tracing_core::",
    "tracing_subscriber::",
    "<tracing_subscriber::",
];

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Local UTC offset, remembered after the first successful lookup.
///
/// The lookup fails once the process runs more than one thread (the `time`
/// crate refuses to read the environment then), in which case UTC is used.
fn local_offset() -> UtcOffset {
    if let Some(offset) = LOCAL_OFFSET.get() {
        return *offset;
    }
    match UtcOffset::current_local_offset() {
        Ok(offset) => *LOCAL_OFFSET.get_or_init(|| offset),
        Err(_) => UtcOffset::UTC,
    }
}

/// Keys of the record elements. An empty key drops its element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderKeys {
    pub time: String,
    pub level: String,
    pub name: String,
    pub caller: String,
    pub message: String,
    pub stacktrace: String,
}

impl Default for EncoderKeys {
    fn default() -> Self {
        Self {
            time: "T".to_string(),
            level: "L".to_string(),
            name: "N".to_string(),
            caller: "C".to_string(),
            message: "M".to_string(),
            stacktrace: "S".to_string(),
        }
    }
}

/// Event formatter producing the console layout.
#[derive(Debug, Clone)]
pub struct ConsoleFormat {
    keys: EncoderKeys,
    stacktrace: Option<Level>,
    offset: UtcOffset,
}

impl ConsoleFormat {
    /// Formatter with default keys, stack traces from `Error` up and the
    /// local UTC offset.
    ///
    /// The local offset can only be read while the process is still single
    /// threaded. Build the first formatter (or logger) early in `main`, before
    /// spawning threads; later ones reuse the offset found then. Without it,
    /// timestamps fall back to UTC unless [`with_offset`](Self::with_offset)
    /// sets one explicitly.
    pub fn new() -> Self {
        Self {
            keys: EncoderKeys::default(),
            stacktrace: Some(Level::Error),
            offset: local_offset(),
        }
    }

    pub fn with_keys(mut self, keys: EncoderKeys) -> Self {
        self.keys = keys;
        self
    }

    /// Attach stack traces to records at `level` and above; `None` disables.
    pub fn with_stacktrace(mut self, level: Option<Level>) -> Self {
        self.stacktrace = level;
        self
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    fn timestamp(&self) -> Result<String, fmt::Error> {
        OffsetDateTime::now_utc()
            .to_offset(self.offset)
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| fmt::Error)
    }
}

impl Default for ConsoleFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut record = RecordVisitor::default();
        event.record(&mut record);

        let level = record
            .severity
            .unwrap_or_else(|| Level::from_tracing(meta.level()));
        let level_text = match record.severity {
            Some(severity) => severity.as_str(),
            None => meta.level().as_str(),
        };
        let caller = match (record.caller.take(), meta.file(), meta.line()) {
            (Some(caller), _, _) => Some(caller),
            (None, Some(file), Some(line)) => Some(short_caller(file, line)),
            _ => None,
        };

        let mut elements: Vec<String> = Vec::with_capacity(6);
        if !self.keys.time.is_empty() {
            elements.push(self.timestamp()?);
        }
        if !self.keys.level.is_empty() {
            elements.push(level_text.to_string());
        }
        if let Some(name) = record.name.take().filter(|n| !n.is_empty())
            && !self.keys.name.is_empty()
        {
            elements.push(name);
        }
        if let Some(caller) = caller
            && !self.keys.caller.is_empty()
        {
            elements.push(caller);
        }
        if !self.keys.message.is_empty() {
            elements.push(record.message);
        }
        if !record.fields.is_empty() {
            elements.push(record.fields);
        }

        writer.write_str(&elements.join("\t"))?;

        let wants_stack = !self.keys.stacktrace.is_empty()
            && self.stacktrace.is_some_and(|threshold| level >= threshold);
        if wants_stack {
            let backtrace = Backtrace::force_capture();
            if backtrace.status() == BacktraceStatus::Captured {
                writer.write_char('\n')?;
                writer.write_str(&trim_internal_frames(&backtrace.to_string()))?;
            }
        }

        writer.write_char('\n')
    }
}

/// Shorten a source path to its last directory and file name.
pub fn short_caller(file: &str, line: u32) -> String {
    let file = file.replace('\\', "/");
    let mut parts = file.rsplitn(3, '/');
    let name = parts.next().unwrap_or_default();
    match parts.next() {
        Some(dir) => format!("{}/{}:{}", dir, name, line),
        None => format!("{}:{}", name, line),
    }
}

/// Drop the leading frames of a rendered backtrace that belong to the logging
/// machinery, so the trace starts at the code that logged. The text is kept
/// as is when every frame would go.
fn trim_internal_frames(rendered: &str) -> String {
    let mut frames: Vec<Vec<&str>> = Vec::new();
    for line in rendered.trim_end().lines() {
        match frames.last_mut() {
            Some(frame) if frame_symbol(line).is_none() => frame.push(line),
            _ => frames.push(vec![line]),
        }
    }

    let internal = frames
        .iter()
        .take_while(|frame| {
            frame_symbol(frame[0])
                .is_some_and(|symbol| INTERNAL_FRAMES.iter().any(|p| symbol.starts_with(p)))
        })
        .count();
    if internal == frames.len() {
        return rendered.trim_end().to_string();
    }
    frames[internal..].concat().join("\n")
}

/// Symbol of a frame header line such as `  12: app::main`.
fn frame_symbol(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let digits = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits == 0 {
        return None;
    }
    trimmed[digits..].strip_prefix(": ")
}

#[derive(Default)]
struct RecordVisitor {
    message: String,
    severity: Option<Level>,
    name: Option<String>,
    caller: Option<String>,
    fields: String,
}

impl RecordVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }

    fn push_rendered(&mut self, rendered: &str) {
        if rendered.is_empty() {
            return;
        }
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        self.fields.push_str(rendered);
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            SEVERITY_FIELD => self.severity = Level::from_capital(value),
            NAME_FIELD => self.name = Some(value.to_string()),
            CALLER_FIELD => self.caller = Some(value.to_string()),
            FIELDS_FIELD => self.push_rendered(value),
            name => self.push_field(name, format_args!("{}", value)),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            SEVERITY_FIELD => self.severity = Level::from_capital(&format!("{:?}", value)),
            NAME_FIELD => self.name = Some(format!("{:?}", value)),
            CALLER_FIELD => self.caller = Some(format!("{:?}", value)),
            FIELDS_FIELD => self.push_rendered(&format!("{:?}", value)),
            name => self.push_field(name, format_args!("{:?}", value)),
        }
    }
}
