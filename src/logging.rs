//! File logging for the `shpipe` binary.
//!
//! The library only emits through the `log` facade; the binary calls
//! [`init`] to route those records to the configured log file.

use std::fs::OpenOptions;

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

use crate::config::LoggingConfig;

/// Longest request excerpt written to the log.
const EXCERPT_CHARS: usize = 200;

/// Parse a level name, falling back to `warn`.
pub fn level_filter(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Warn)
}

/// Install a logger appending to the configured file.
/// Best-effort: returns false and logs nothing if the file cannot be opened
/// (logging must never stop a pipeline from running).
pub fn init(config: &LoggingConfig) -> bool {
    if !config.enabled {
        return false;
    }
    let Some(path) = config.resolved_path() else {
        return false;
    };
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return false;
    };

    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_thread_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Off)
        .build();
    WriteLogger::init(level_filter(&config.level), log_config, file).is_ok()
}

/// Compact single-line excerpt of `text` for log records.
pub fn excerpt(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= EXCERPT_CHARS {
        return line;
    }
    let mut cut: String = line.chars().take(EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}
