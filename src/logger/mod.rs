//! Structured, tag-based logging
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-stage debug output via `--debug-<tag>` flags
//! - Colored console output plus `logs/launch-bundler.log`
//!
//! ```rust,ignore
//! use launch_bundler::logger::{self, LogTag};
//!
//! logger::info(LogTag::Bundle, "Bundle accepted");
//! logger::debug(LogTag::Chunker, "chunk 3: 1114 bytes"); // only with --debug-chunker
//! ```
//!
//! Call `logger::init()` once at startup, after `arguments::set_cmd_args`.

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Reads debug flags from the stored arguments and opens the log file.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Always shown.
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Only shown with `--debug-<tag>` for this tag.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Only shown with `--verbose` or `--verbose-<tag>`.
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Flush pending file writes; call during shutdown.
pub fn flush() {
    file::flush_file_logging();
}
