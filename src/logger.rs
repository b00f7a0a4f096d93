//! Logging utilities for functions-otel-lite itself.
//!
//! This module provides a simple logging interface with level filtering and
//! prefixing for the crate's own diagnostics. It deliberately avoids the
//! `tracing` machinery: these messages must work before (and during) the
//! installation of the tracing subscriber.
//!
//! # Example
//! ```
//! use functions_otel_lite::logger::Logger;
//!
//! static LOGGER: Logger = Logger::const_new("my_module");
//!
//! LOGGER.info("starting module");
//! ```

use crate::constants::env_vars;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    None,
    Error,
    Warn,
    Info,
    Debug,
}

impl Level {
    fn parse(value: &str) -> Option<Level> {
        match value {
            "none" => Some(Level::None),
            "error" => Some(Level::Error),
            "warn" => Some(Level::Warn),
            "info" => Some(Level::Info),
            "debug" | "verbose" => Some(Level::Debug),
            _ => None,
        }
    }
}

// Global log level cache
static LOG_LEVEL: OnceLock<Level> = OnceLock::new();

fn log_level() -> Level {
    *LOG_LEVEL.get_or_init(|| {
        let level = env::var(env_vars::LOG_LEVEL)
            .or_else(|_| env::var("LOG_LEVEL"))
            .unwrap_or_default()
            .to_lowercase();

        Level::parse(&level).unwrap_or(Level::Info)
    })
}

/// Logger with level filtering and consistent prefixing.
#[derive(Clone)]
pub struct Logger {
    prefix: &'static str,
}

impl Logger {
    /// Create a new logger with the given prefix that can be used in const contexts.
    pub const fn const_new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    fn enabled(&self, level: Level) -> bool {
        let current = log_level();
        current != Level::None && level <= current
    }

    fn format_message(&self, message: &str) -> String {
        format!("[{}] {}", self.prefix, message)
    }

    /// Log a debug message
    pub fn debug(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Debug) {
            println!("{}", self.format_message(message.as_ref()));
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Info) {
            println!("{}", self.format_message(message.as_ref()));
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Warn) {
            eprintln!("{}", self.format_message(message.as_ref()));
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl AsRef<str>) {
        if self.enabled(Level::Error) {
            eprintln!("{}", self.format_message(message.as_ref()));
        }
    }
}
