//! Level and tag filtering in front of the formatter

use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Filtering rules, in order:
/// 1. errors always print
/// 2. anything above the minimum level is dropped
/// 3. debug needs `--debug-<tag>` (or `--debug-all`)
/// 4. verbose needs `--verbose` or `--verbose-<tag>`
/// 5. a non-empty `--log-tags=` list restricts the rest
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }
    if level > config.min_level {
        return false;
    }
    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag);
    }
    if level == LogLevel::Verbose {
        return config.verbose_all || is_verbose_enabled_for_tag(tag);
    }
    if !config.enabled_tags.is_empty() && !config.enabled_tags.contains(&tag.to_debug_key()) {
        return false;
    }

    true
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }
    super::format::format_and_log(tag, level.as_str(), message);
}
