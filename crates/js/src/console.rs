//! Routing of script console output into the `log` facade.
//!
//! Every record is emitted under the `js::console` target so hosts can filter
//! script chatter separately from bridge diagnostics.

use crate::bindings::{HostLogger, LogLevel};
use log::Level;

/// Log target used for script console output.
pub const CONSOLE_TARGET: &str = "js::console";

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::Trace,
            LogLevel::Debug => Self::Debug,
            LogLevel::Info => Self::Info,
            LogLevel::Warn => Self::Warn,
            LogLevel::Error => Self::Error,
        }
    }
}

/// A `HostLogger` that forwards to `log` with a `[JS]` prefix, optionally
/// naming the context the line came from.
#[derive(Debug, Default, Clone)]
pub struct ConsoleLogger {
    label: Option<String>,
}

impl ConsoleLogger {
    /// Logger whose lines read `[JS label]: ..`.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self { label: Some(label.into()) }
    }

    /// Log a script exception with its stack, if the engine provided one.
    pub fn exception(&self, message: &str, stack: Option<&str>) {
        match stack.filter(|trace| !trace.is_empty()) {
            Some(trace) => self.log(LogLevel::Error, &format!("{message}\n{trace}")),
            None => self.log(LogLevel::Error, message),
        }
    }
}

impl HostLogger for ConsoleLogger {
    #[inline]
    fn log(&self, level: LogLevel, message: &str) {
        match &self.label {
            Some(label) => log::log!(target: CONSOLE_TARGET, level.into(), "[JS {label}]: {message}"),
            None => log::log!(target: CONSOLE_TARGET, level.into(), "[JS]: {message}"),
        }
    }
}
