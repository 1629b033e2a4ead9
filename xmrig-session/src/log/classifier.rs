//! Turns raw worker output into structured log entries.
//!
//! Worker lines look like
//!
//! ```text
//! [2024-03-02 18:04:11.052]  net      use pool pool.example.org:443  203.0.113.7
//! ```
//!
//! i.e. a bracketed timestamp, a lowercase category tag padded with spaces,
//! then the message. Lines that don't follow this shape (startup banner,
//! stack traces) are kept whole as the message.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid regex"));

/// Blank lines and bare timestamps with nothing after them.
static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\[[^\]]*\])?\s*$").expect("valid regex"));

static LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[(?P<ts>[^\]]+)\]\s+(?:(?P<cat>[a-z][a-z0-9-]*)\s{2,})?(?P<msg>.*?)\s*$")
        .expect("valid regex")
});

static ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(error|failed|fatal)\b").expect("valid regex"));

static WARNING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(warn|warning|rejected|timeout|timed out|disconnected|retry)\b")
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One parsed worker log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Timestamp as printed by the worker.
    pub timestamp: Option<String>,
    pub level: LogLevel,
    /// Subsystem tag such as `net`, `cpu` or `miner`.
    pub category: Option<String>,
    pub message: String,
}

fn strip_ansi(line: &str) -> std::borrow::Cow<'_, str> {
    ANSI_ESCAPE.replace_all(line, "")
}

/// Whether `line` carries nothing worth showing.
pub fn is_noise(line: &str) -> bool {
    NOISE.is_match(&strip_ansi(line))
}

/// Parse one raw line; `None` if it is noise.
pub fn classify(line: &str) -> Option<LogEntry> {
    let clean = strip_ansi(line);
    if NOISE.is_match(&clean) {
        return None;
    }

    let (timestamp, category, message) = match LINE.captures(&clean) {
        Some(caps) => (
            caps.name("ts").map(|m| m.as_str().to_string()),
            caps.name("cat").map(|m| m.as_str().to_string()),
            caps.name("msg").map_or("", |m| m.as_str()).to_string(),
        ),
        None => (None, None, clean.trim().to_string()),
    };

    Some(LogEntry {
        timestamp,
        level: level_of(&message),
        category,
        message,
    })
}

fn level_of(message: &str) -> LogLevel {
    if ERROR.is_match(message) {
        LogLevel::Error
    } else if WARNING.is_match(message) {
        LogLevel::Warning
    } else {
        LogLevel::Info
    }
}

/// Classify a newest-first batch into chronological entries.
///
/// Noise lines are dropped and the survivors reversed so the returned
/// entries run oldest to newest.
pub fn ingest<S: AsRef<str>>(batch: &[S]) -> Vec<LogEntry> {
    batch
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !is_noise(line))
        .rev()
        .filter_map(classify)
        .collect()
}
