//! Append-only log file under `logs/`

use super::config::get_logger_config;
use once_cell::sync::Lazy;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::sync::Mutex;

pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "launch-bundler.log";

static LOG_WRITER: Lazy<Mutex<Option<BufWriter<File>>>> = Lazy::new(|| Mutex::new(None));

pub fn init_file_logging() {
    if !get_logger_config().file_logging {
        return;
    }
    if let Err(e) = fs::create_dir_all(LOG_DIR) {
        eprintln!("Logger: cannot create {}: {}", LOG_DIR, e);
        return;
    }

    let path = std::path::Path::new(LOG_DIR).join(LOG_FILE_NAME);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            if let Ok(mut writer) = LOG_WRITER.lock() {
                *writer = Some(BufWriter::new(file));
            }
        }
        Err(e) => eprintln!("Logger: cannot open {}: {}", path.display(), e),
    }
}

/// No-op until `init_file_logging` succeeded
pub fn write_to_file(line: &str) {
    if let Ok(mut guard) = LOG_WRITER.lock() {
        if let Some(writer) = guard.as_mut() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

pub fn flush_file_logging() {
    if let Ok(mut guard) = LOG_WRITER.lock() {
        if let Some(writer) = guard.as_mut() {
            let _ = writer.flush();
        }
    }
}
