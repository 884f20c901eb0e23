//! Logging
//!
//! Every diagnostic goes through the `log` facade under the `strata` target.
//! Callers can additionally register a [`LogSink`] that receives each
//! message together with its [`LogLevel`]. The sink is called from whichever
//! thread emitted the record (client or render thread), so it must be
//! thread-safe.

use std::fmt;
use std::sync::{Arc, Once};

const TARGET: &str = "strata";

/// Severity of a message delivered to a [`LogSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Debug / verbose.
    Debug,
    /// General message.
    Message,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Message => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Caller-supplied log function.
pub type LogSink = Arc<dyn Fn(&str, LogLevel) + Send + Sync>;

/// Forwards records to `log` and to the optional caller sink.
#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<LogSink>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Logger {
    #[must_use]
    pub fn new(sink: Option<LogSink>) -> Self {
        Self { sink }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        log::log!(target: TARGET, level.as_log_level(), "{message}");
        if let Some(sink) = &self.sink {
            sink(message, level);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn message(&self, message: &str) {
        self.log(LogLevel::Message, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// `env_logger` configuration for binaries and tests.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "strata=debug").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger.
///
/// Idempotent; subsequent calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Warn);
        }

        builder.write_style(config.write_style);
        builder.is_test(config.is_test);

        // Another logger may already be installed by the host application.
        if builder.try_init().is_ok() {
            log::debug!(target: TARGET, "logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn sink_receives_level_and_message() {
        let seen: Arc<Mutex<Vec<(String, LogLevel)>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let logger = Logger::new(Some(Arc::new(move |msg: &str, level| {
            captured.lock().push((msg.to_string(), level));
        })));

        logger.warning("careful");
        logger.error("broken");

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("careful".to_string(), LogLevel::Warning));
        assert_eq!(seen[1].1, LogLevel::Error);
    }

    #[test]
    fn logger_without_sink_is_silent() {
        init_logging(LoggingConfig {
            is_test: true,
            ..Default::default()
        });
        Logger::default().message("nobody listens");
    }
}
