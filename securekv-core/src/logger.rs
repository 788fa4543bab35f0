//! Bridge from the `log` facade to a host-provided logger.
//!
//! The storage layer logs through `log` macros. A host registers its own
//! sink once with [`set_logger`]; until then records go to stderr.

use std::sync::{Arc, OnceLock};

/// Receives log messages from the storage layer.
///
/// # Examples
///
/// ```rust
/// use securekv_core::logger::{LogLevel, Logger};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// object SecureKvLogger : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Timber.tag("securekv").d("%s %s", level, message)
///     }
/// }
///
/// setLogger(SecureKvLogger) // once, at application start
/// ```
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait Logger: Sync + Send {
    /// Records `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of the storage layer.
    Info,
    /// Potentially harmful situations, e.g. a stale index.
    Warn,
    /// Failures.
    Error,
}

/// `log::Log` implementation forwarding to the registered [`Logger`].
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        // Debug and trace records are only forwarded from this crate.
        let is_own_record = record
            .module_path()
            .is_some_and(|module_path| module_path.starts_with("securekv"));
        let is_verbose =
            record.level() == log::Level::Debug || record.level() == log::Level::Trace;
        if is_verbose && !is_own_record {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(log_level(record.level()), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

const fn log_level(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug => LogLevel::Debug,
        log::Level::Trace => LogLevel::Trace,
    }
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Registers the host logger and installs the `log` bridge.
///
/// Only the first call takes effect; later calls are ignored with a notice
/// on stderr.
#[cfg_attr(feature = "ffi", uniffi::export)]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
