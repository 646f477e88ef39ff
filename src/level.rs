//! Severity levels.
//!
//! The set is closed and ordered by increasing severity. The three levels above
//! [`Level::Error`] have no `tracing` counterpart, so they travel as `ERROR`
//! events tagged with their own name.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;

/// Verbosity threshold and record severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Logged like `Error`; panics only in development builds of other loggers.
    DPanic,
    /// Logged, then the calling thread panics.
    Panic,
    /// Logged, then the process exits.
    Fatal,
}

impl Level {
    /// Every level, least severe first.
    pub const ALL: [Level; 7] = [
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::DPanic,
        Level::Panic,
        Level::Fatal,
    ];

    /// Map a configuration string to a level.
    ///
    /// Only the exact names are recognized (`"Debug"`, not `"debug"`).
    /// Anything else, including the empty string, yields [`Level::Info`].
    pub fn parse(s: &str) -> Level {
        Level::ALL
            .into_iter()
            .find(|level| level.name() == s)
            .unwrap_or_default()
    }

    /// Configuration spelling (`"Debug"`, `"DPanic"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warn => "Warn",
            Level::Error => "Error",
            Level::DPanic => "DPanic",
            Level::Panic => "Panic",
            Level::Fatal => "Fatal",
        }
    }

    /// Capitalized form used in rendered records.
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::DPanic => "DPANIC",
            Level::Panic => "PANIC",
            Level::Fatal => "FATAL",
        }
    }

    /// Inverse of [`Level::as_str`].
    pub fn from_capital(s: &str) -> Option<Level> {
        Level::ALL.into_iter().find(|level| level.as_str() == s)
    }

    pub fn to_tracing(self) -> tracing::Level {
        match self {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warn => tracing::Level::WARN,
            Level::Error | Level::DPanic | Level::Panic | Level::Fatal => tracing::Level::ERROR,
        }
    }

    /// `TRACE` folds into `Debug`.
    pub fn from_tracing(level: &tracing::Level) -> Level {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }

    pub fn to_level_filter(self) -> LevelFilter {
        LevelFilter::from_level(self.to_tracing())
    }
}

impl FromStr for Level {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Level::parse(s))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        for level in Level::ALL {
            assert_eq!(Level::parse(level.name()), level);
        }
        assert_eq!("Fatal".parse::<Level>(), Ok(Level::Fatal));
    }

    #[test]
    fn test_parse_unknown_defaults_to_info() {
        for input in [
            "", "verbose", "trace", "Critical", "0", "Info!", "debug", "ERROR", "dpanic", " Warn",
            " WARN ",
        ] {
            assert_eq!(Level::parse(input), Level::Info, "input {:?}", input);
        }
        assert_eq!("nonsense".parse::<Level>(), Ok(Level::Info));
    }

    #[test]
    fn test_ordering() {
        let mut sorted = Level::ALL;
        sorted.sort();
        assert_eq!(sorted, Level::ALL);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Panic < Level::Fatal);
    }

    #[test]
    fn test_capital_round_trip() {
        for level in Level::ALL {
            assert_eq!(Level::from_capital(level.as_str()), Some(level));
        }
        assert_eq!(Level::from_capital("Info"), None);
        assert_eq!(Level::DPanic.to_string(), "DPANIC");
    }

    #[test]
    fn test_tracing_mapping() {
        assert_eq!(Level::Warn.to_tracing(), tracing::Level::WARN);
        assert_eq!(Level::Fatal.to_tracing(), tracing::Level::ERROR);
        assert_eq!(Level::from_tracing(&tracing::Level::TRACE), Level::Debug);
        assert_eq!(Level::Panic.to_level_filter(), LevelFilter::ERROR);
        assert_eq!(Level::Debug.to_level_filter(), LevelFilter::DEBUG);
    }
}
