/// Process-wide argument storage
///
/// The logger reads its `--debug-<tag>` / `--verbose` flags from here, while
/// clap only sees what `split_logging_flags` leaves behind.
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Override the stored arguments (binaries and tests)
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Value following `flag`, if any
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}

/// True for flags consumed by the logger rather than the CLI parser
pub fn is_logging_flag(arg: &str) -> bool {
    arg == "--verbose"
        || arg == "--quiet"
        || arg == "--no-log-file"
        || arg.starts_with("--debug-")
        || arg.starts_with("--verbose-")
        || arg.starts_with("--log-tags=")
}

/// Returns (cli args, logging flags); the program name stays in the first list
pub fn split_logging_flags(args: Vec<String>) -> (Vec<String>, Vec<String>) {
    args.into_iter().partition(|a| !is_logging_flag(a))
}

pub fn is_debug_bundle_enabled() -> bool {
    has_arg("--debug-bundle")
}

pub fn is_debug_chunker_enabled() -> bool {
    has_arg("--debug-chunker")
}

pub fn is_dry_run_enabled() -> bool {
    has_arg("--dry-run")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_logging_flags() {
        let args = vec![
            "launch-bundler".to_string(),
            "--debug-chunker".to_string(),
            "pool-bundle".to_string(),
            "--verbose".to_string(),
            "--iterations".to_string(),
            "2".to_string(),
        ];
        let (cli, logging) = split_logging_flags(args);
        assert_eq!(cli, vec!["launch-bundler", "pool-bundle", "--iterations", "2"]);
        assert_eq!(logging, vec!["--debug-chunker", "--verbose"]);
    }

    #[test]
    fn test_stored_args_lookup() {
        set_cmd_args(vec![
            "bin".to_string(),
            "--debug-bundle".to_string(),
            "--config".to_string(),
            "alt.json".to_string(),
        ]);
        assert!(has_arg("--debug-bundle"));
        assert!(is_debug_bundle_enabled());
        assert_eq!(get_arg_value("--config").as_deref(), Some("alt.json"));
        assert_eq!(get_arg_value("--missing"), None);
    }
}
