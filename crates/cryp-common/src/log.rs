// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Event log for the engine controller
//!
//! A small, no_std ring of formatted entries. There is no timer on the
//! control path, so entries are ordered by a sequence number instead of a
//! timestamp.
//!
//! # Security
//!
//! - Key material and IV contents must NEVER be logged
//! - Log levels control what is recorded in production vs development

use core::fmt::{self, Write};
use heapless::{Deque, String};

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 96;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Errors that require immediate attention
    Error = 0,
    /// Warnings about potential issues
    Warn = 1,
    /// Informational messages
    Info = 2,
    /// Debug messages (development only)
    Debug = 3,
    /// Trace messages (very verbose, development only)
    Trace = 4,
}

impl LogLevel {
    /// Get the log level name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Get a short prefix for the log level
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Trace => 'T',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogLevel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.as_str());
    }
}

/// Log entry structure
#[derive(Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Sequence number, monotonically increasing per buffer
    pub seq: u32,
    /// Component that produced the entry
    pub source: &'static str,
    /// Log message (truncated to [`MAX_LOG_MESSAGE_LEN`])
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl LogEntry {
    /// Create a new log entry from a preformatted message
    #[must_use]
    pub fn new(level: LogLevel, seq: u32, source: &'static str, message: &str) -> Self {
        let mut msg = String::new();
        for c in message.chars() {
            if msg.push(c).is_err() {
                break;
            }
        }

        Self {
            level,
            seq,
            source,
            message: msg,
        }
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:08X}] {} [{}] {}",
            self.seq,
            self.level.prefix(),
            self.source,
            self.message
        )
    }
}

/// Writer that stops at capacity instead of failing the whole format
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Circular log buffer
///
/// Once full, each new entry evicts the oldest one.
pub struct LogBuffer {
    entries: Deque<LogEntry, LOG_BUFFER_SIZE>,
    next_seq: u32,
    dropped: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Create a new empty log buffer recording `Info` and above
    #[must_use]
    pub const fn new() -> Self {
        Self::with_level(LogLevel::Info)
    }

    /// Create a new empty log buffer with the given minimum level
    #[must_use]
    pub const fn with_level(min_level: LogLevel) -> Self {
        Self {
            entries: Deque::new(),
            next_seq: 0,
            dropped: 0,
            min_level,
        }
    }

    /// Set the minimum log level
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Get the minimum log level
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Check if a log level should be recorded
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    /// Record a preformatted message
    pub fn write(&mut self, level: LogLevel, source: &'static str, message: &str) {
        if !self.should_log(level) {
            return;
        }
        let entry = LogEntry::new(level, self.next_seq, source, message);
        self.push(entry);
    }

    /// Log with format arguments
    pub fn log(&mut self, level: LogLevel, source: &'static str, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }

        let mut message = String::<MAX_LOG_MESSAGE_LEN>::new();
        let _ = Truncating(&mut message).write_fmt(args);

        self.push(LogEntry {
            level,
            seq: self.next_seq,
            source,
            message,
        });
    }

    fn push(&mut self, entry: LogEntry) {
        if self.entries.is_full() {
            self.entries.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
        }
        // Cannot fail: a slot was freed above
        let _ = self.entries.push_back(entry);
        self.next_seq = self.next_seq.wrapping_add(1);
    }

    /// Get the number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries evicted because the buffer was full
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Most recent entry, if any
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Clear all entries (sequence numbering continues)
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over entries (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    /// Remove and return the oldest entry
    pub fn drain_one(&mut self) -> Option<LogEntry> {
        self.entries.pop_front()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($buffer:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Error, $source, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($buffer:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Warn, $source, format_args!($($arg)*))
    };
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($buffer:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Info, $source, format_args!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($buffer:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Debug, $source, format_args!($($arg)*))
    };
}

/// Log a trace-level message
#[macro_export]
macro_rules! log_trace {
    ($buffer:expr, $source:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Trace, $source, format_args!($($arg)*))
    };
}
