//! Engine log sinks.
//!
//! Logs go to **stderr** so stdout stays parseable for scripts. Components
//! receive a sink by injection; there is no global logger.

use std::io::Write;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Destination for engine log lines. Implementations write to stderr
/// (human or JSON) or swallow everything.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: Option<serde_json::Value>);
}

impl dyn LogSink {
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, None);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, None);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, None);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, None);
    }
}

/// Human-friendly lines on stderr: "warn   correction for title failed".
pub struct StderrLog {
    min_level: LogLevel,
}

impl StderrLog {
    pub fn new() -> StderrLog {
        StderrLog {
            min_level: LogLevel::Info,
        }
    }

    pub fn verbose() -> StderrLog {
        StderrLog {
            min_level: LogLevel::Debug,
        }
    }
}

impl Default for StderrLog {
    fn default() -> Self {
        StderrLog::new()
    }
}

impl LogSink for StderrLog {
    fn log(&self, level: LogLevel, message: &str, context: Option<serde_json::Value>) {
        if level < self.min_level {
            return;
        }
        let line = match context {
            Some(ctx) => format!("{:5}  {}  {}\n", level.as_str(), message, ctx),
            None => format!("{:5}  {}\n", level.as_str(), message),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable log: one JSON object per line on stderr.
pub struct JsonLog;

impl LogSink for JsonLog {
    fn log(&self, level: LogLevel, message: &str, context: Option<serde_json::Value>) {
        let obj = serde_json::json!({
            "event": "log",
            "level": level.as_str(),
            "message": message,
            "context": context,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op sink when logging is disabled.
pub struct NoLog;

impl LogSink for NoLog {
    fn log(&self, _level: LogLevel, _message: &str, _context: Option<serde_json::Value>) {}
}

/// Log mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogMode {
    Off,
    Human,
    Json,
}

impl LogMode {
    /// Default: human logs when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            LogMode::Human
        } else {
            LogMode::Off
        }
    }

    /// Build a sink for this mode. Caller passes it to the engine.
    pub fn sink(&self) -> std::sync::Arc<dyn LogSink> {
        match self {
            LogMode::Off => std::sync::Arc::new(NoLog),
            LogMode::Human => std::sync::Arc::new(StderrLog::new()),
            LogMode::Json => std::sync::Arc::new(JsonLog),
        }
    }
}
