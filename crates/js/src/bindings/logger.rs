use super::values::LogLevel;

/// Cross-runtime logger used by bindings like `console.*`.
pub trait HostLogger: Send + Sync {
    /// Log a message with a given level.
    fn log(&self, level: LogLevel, message: &str);
}

/// Anything host functions run against that can hand out a logger.
pub trait HostEnvironment {
    /// Logger used by host functions such as `console.*`.
    fn logger(&self) -> &dyn HostLogger;
}
