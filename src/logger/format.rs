//! Console and file formatting
//!
//! Console lines get a colored, padded tag and level and are wrapped at
//! word boundaries; the file copy is plain text with a full timestamp.

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

const TAG_WIDTH: usize = 10;
const LOG_TYPE_WIDTH: usize = 8;
const MAX_LINE_LENGTH: usize = 145;

pub fn format_and_log(tag: LogTag, log_type: &str, message: &str) {
    let now = Local::now();
    let prefix = now.format("%H:%M:%S ").to_string();

    let base_line = format!(
        "{}[{}] [{}] ",
        prefix.dimmed(),
        format_tag(&tag),
        format_log_type(log_type)
    );
    // Visible width: time + "[tag] [type] "
    let prefix_width = prefix.len() + TAG_WIDTH + LOG_TYPE_WIDTH + 6;
    let available = MAX_LINE_LENGTH.saturating_sub(prefix_width).max(50);

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let tag_clean = tag.to_plain_string();

    for (i, chunk) in wrap_text(message, available).iter().enumerate() {
        if i == 0 {
            print_stdout_safe(&format!("{}{}", base_line, chunk));
        } else {
            print_stdout_safe(&format!("{}{}", " ".repeat(prefix_width), chunk));
        }
        write_to_file(&format!(
            "{} [{}] [{}] {}",
            timestamp, tag_clean, log_type, chunk
        ));
    }
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Wallet => label.bright_magenta().bold(),
        LogTag::Lut => label.bright_cyan().bold(),
        LogTag::Builder => label.bright_green().bold(),
        LogTag::Chunker => label.bright_blue().bold(),
        LogTag::Bundle => label.bright_white().bold(),
        LogTag::Relay => label.magenta().bold(),
        LogTag::Rpc => label.cyan().bold(),
        LogTag::State => label.yellow().bold(),
        LogTag::Test => label.blue().bold(),
        LogTag::Other(_) => label.white().bold(),
    }
}

fn format_log_type(log_type: &str) -> ColoredString {
    let label = format!("{:<width$}", log_type, width = LOG_TYPE_WIDTH);
    match log_type {
        "ERROR" => label.bright_red().bold(),
        "WARNING" => label.yellow().bold(),
        "DEBUG" | "VERBOSE" => label.dimmed(),
        _ => label.white().bold(),
    }
}

/// Exits quietly when stdout is a closed pipe
fn print_stdout_safe(message: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", message).and_then(|_| out.flush()) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
}

/// Wraps on whitespace, keeps existing newlines, hard-splits overlong words.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for line in text.split('\n') {
        let mut current = String::new();
        for word in line.split_whitespace() {
            let mut word = word;
            while word.chars().count() > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let split_at = word
                    .char_indices()
                    .nth(max_width)
                    .map(|(i, _)| i)
                    .unwrap_or(word.len());
                lines.push(word[..split_at].to_string());
                word = &word[split_at..];
            }
            if word.is_empty() {
                continue;
            }
            if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word.chars().count() <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_message_unchanged() {
        assert_eq!(wrap_text("bundle accepted", 50), vec!["bundle accepted"]);
    }

    #[test]
    fn test_wrap_splits_on_words_and_newlines() {
        let lines = wrap_text("aaa bbb ccc\nddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc", "ddd"]);
    }

    #[test]
    fn test_wrap_hard_splits_long_words() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }
}
