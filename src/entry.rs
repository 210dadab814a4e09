//! Per-log-call metadata, read-only input to encoding.
//!
//! An `Entry` carries everything about a log call except its structured
//! fields: severity, timestamp, message, and the optional logger name,
//! caller location, and stack trace. The logger/core layer that owns level
//! filtering and call-site capture builds these; the encoders only read
//! them.

use std::fmt;

use chrono::{DateTime, Utc};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Lowercase name, the default wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }

    /// Uppercase name, used by the console-oriented level formatters.
    pub fn as_upper_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The call site that produced a log entry.
///
/// `defined` distinguishes "no caller captured" from a real location;
/// encoders skip undefined callers entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryCaller {
    pub defined: bool,
    pub file: String,
    pub line: u32,
}

impl EntryCaller {
    /// A caller at the given file and line.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            defined: true,
            file: file.into(),
            line,
        }
    }

    /// The zero value: no caller captured.
    pub fn undefined() -> Self {
        Self::default()
    }

    /// `file:line` with the full file path.
    pub fn full_path(&self) -> String {
        if !self.defined {
            return "undefined".to_string();
        }
        format!("{}:{}", self.file, self.line)
    }

    /// `file:line` keeping only the last two path segments, enough to
    /// identify a file inside its package without the noise of a full
    /// checkout path.
    pub fn trimmed_path(&self) -> String {
        if !self.defined {
            return "undefined".to_string();
        }
        let trimmed = match self.file.rfind('/') {
            Some(idx) => match self.file[..idx].rfind('/') {
                Some(idx2) => &self.file[idx2 + 1..],
                None => &self.file,
            },
            None => &self.file,
        };
        format!("{}:{}", trimmed, self.line)
    }
}

impl fmt::Display for EntryCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// A single log call's metadata.
///
/// Optional pieces are represented by empty strings (`logger_name`,
/// `stack`) or an undefined caller.
#[derive(Debug, Clone)]
pub struct Entry {
    pub level: Level,
    pub time: DateTime<Utc>,
    pub logger_name: String,
    pub message: String,
    pub caller: EntryCaller,
    pub stack: String,
}

impl Entry {
    /// An entry stamped with the current time and no optional metadata.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            time: Utc::now(),
            logger_name: String::new(),
            message: message.into(),
            caller: EntryCaller::undefined(),
            stack: String::new(),
        }
    }
}
