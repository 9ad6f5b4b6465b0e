use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

type SharedLogHandler = Arc<dyn Fn(&Logger, LogLevel, &str) + Send + Sync + 'static>;

/// Named logger with its own level and an optional user handler.
///
/// Messages below the logger's level are discarded before any handler runs.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    name: String,
    log_level: AtomicU8,
    user_log_handler: RwLock<Option<SharedLogHandler>>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                name: name.into(),
                log_level: AtomicU8::new(LogLevel::Info as u8),
                user_log_handler: RwLock::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level<L>(&self, level: L) -> Result<(), LogError>
    where
        L: IntoLogLevel,
    {
        let level = level.into_log_level()?;
        self.inner.log_level.store(level as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Routes messages to `handler` instead of the console.
    pub fn set_log_handler<F>(&self, handler: F)
    where
        F: Fn(&Logger, LogLevel, &str) + Send + Sync + 'static,
    {
        *self
            .inner
            .user_log_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    pub fn clear_log_handler(&self) {
        self.inner
            .user_log_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.dispatch(LogLevel::Debug, message.as_ref());
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.dispatch(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.dispatch(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.dispatch(LogLevel::Error, message.as_ref());
    }

    fn dispatch(&self, level: LogLevel, message: &str) {
        if level == LogLevel::Silent || level < self.log_level() {
            return;
        }
        let handler = self
            .inner
            .user_log_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match handler {
            Some(handler) => handler(self, level, message),
            None => console_log_handler(self, level, message),
        }
    }
}

fn console_log_handler(logger: &Logger, level: LogLevel, message: &str) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let line = format!("[{now}]  {} {level}: {message}", logger.name());
    match level {
        LogLevel::Warn | LogLevel::Error => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Silent = 4,
}

impl LogLevel {
    /// Accepted spellings, as used in configuration.
    pub const NAMES: [&'static str; 5] = ["debug", "info", "warn", "error", "silent"];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Silent,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

pub trait IntoLogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError>;
}

impl IntoLogLevel for LogLevel {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        Ok(self)
    }
}

impl IntoLogLevel for &str {
    fn into_log_level(self) -> Result<LogLevel, LogError> {
        LogLevel::from_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => write!(f, "Invalid log level \"{level}\""),
        }
    }
}

impl std::error::Error for LogError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn handler_receives_messages_at_or_above_level() {
        let logger = Logger::new("@test/logger");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        logger.set_log_handler(move |logger, level, message| {
            sink.lock()
                .unwrap()
                .push(format!("{} {level} {message}", logger.name()));
        });

        logger.set_log_level("warn").unwrap();
        logger.info("dropped");
        logger.warn("kept");
        logger.error("also kept");

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            ["@test/logger WARN kept", "@test/logger ERROR also kept"]
        );
    }

    #[test]
    fn silent_discards_everything() {
        let logger = Logger::new("@test/silent");
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        logger.set_log_handler(move |_, _, _| *sink.lock().unwrap() += 1);
        logger.set_log_level(LogLevel::Silent).unwrap();
        logger.error("nothing");
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn parses_levels() {
        assert_eq!("WARNING".into_log_level().unwrap(), LogLevel::Warn);
        assert_eq!(
            "loud".into_log_level().unwrap_err(),
            LogError::InvalidLogLevel("loud".to_string())
        );
        for name in LogLevel::NAMES {
            assert_eq!(name.into_log_level().unwrap().as_str(), name);
        }
    }
}
