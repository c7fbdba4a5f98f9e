//! Logging setup for the exosphere tools.
//!
//! Library crates only emit `tracing` events; this crate installs the
//! subscriber. Console output is always on. A JSON file log can be added for
//! machine-readable run records.

use std::fs::File;
use std::path::{Path, PathBuf};

use exo_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written inside the log directory.
pub const LOG_FILE_NAME: &str = "exo.log";

/// Filter string from the config's log level, or the default.
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Create the log directory and open a fresh log file inside it.
pub fn open_log_file(log_dir: &Path) -> std::io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = File::create(&path)?;
    Ok((path, file))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the config's `debug.log_level`. When
/// `json_log` is set and `log_dir` can be created, events are also written
/// as JSON to `log_dir/exo.log`. Call once, early in `main`.
///
/// ```no_run
/// use exo_config::Config;
///
/// let config = Config::default();
/// exo_log::init_logging(None, false, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, json_log: bool, config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if json_log
        && let Some(log_dir) = log_dir
        && let Ok((_, log_file)) = open_log_file(log_dir)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_filter_without_config() {
        assert_eq!(filter_directive(None), "info");
    }

    #[test]
    fn test_filter_from_config() {
        let mut config = Config::default();
        config.debug.log_level = " debug,exo_grid=trace ".to_string();
        assert_eq!(filter_directive(Some(&config)), "debug,exo_grid=trace");

        config.debug.log_level.clear();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,exo_grid=trace",
            "warn,exo_grid::traversal=debug",
            "error",
        ];
        for filter_str in &valid_filters {
            let result = EnvFilter::try_from(*filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {}", filter_str);
        }
    }

    #[test]
    fn test_subsystem_filter_display() {
        let filter = EnvFilter::new("info,exo_grid=debug");
        let filter_str = format!("{}", filter);
        assert!(filter_str.contains("exo_grid=debug"));
        assert!(filter_str.contains("info"));
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs").join("nested");
        let (path, mut file) = open_log_file(&log_dir).unwrap();
        assert_eq!(path.file_name().unwrap(), LOG_FILE_NAME);

        let line = serde_json::json!({ "level": "INFO", "fields": { "message": "grid built" } });
        writeln!(file, "{line}").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed["fields"]["message"], "grid built");
    }
}
