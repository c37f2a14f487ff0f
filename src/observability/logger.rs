//! Structured JSON event lines
//!
//! - One line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Emitted through the `log` facade under target `beanindex`; the host
//!   application decides where lines go

use std::fmt;

/// Log target for every line emitted by this crate
pub const TARGET: &str = "beanindex";

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-record detail
    Trace = 0,
    /// Index lifecycle
    Info = 1,
    /// Accepted inconsistencies (stale buckets)
    Warn = 2,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
        }
    }

    /// Matching `log` level
    pub fn level(&self) -> log::Level {
        match self {
            Severity::Trace => log::Level::Trace,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Formats and emits event lines
pub struct Logger;

impl Logger {
    /// Emit an event with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let level = severity.level();
        if !log::log_enabled!(target: TARGET, level) {
            return;
        }
        log::log!(target: TARGET, level, "{}", Self::format(severity, event, fields));
    }

    /// Render one event as a JSON object
    pub fn format(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        output.push_str(&quote(event));
        output.push_str(",\"severity\":");
        output.push_str(&quote(severity.as_str()));
        for (key, value) in sorted {
            output.push(',');
            output.push_str(&quote(key));
            output.push(':');
            output.push_str(&quote(value));
        }
        output.push('}');
        output
    }
}

fn quote(s: &str) -> String {
    // Serializing a str cannot fail.
    serde_json::to_string(s).unwrap_or_else(|_| String::from("\"\""))
}
