//! Logging Module
//!
//! Sets up `tracing` with:
//! - a human-readable stdout layer;
//! - a JSON file layer with daily rotation in the log directory;
//! - a `log` crate bridge so dependencies using `log` macros are captured.
//!
//! Rolled files from previous days are gzip-compressed in the background.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "clipdeck.log";

/// Initialize the logging system.
///
/// Returns a `WorkerGuard` when file logging is enabled; it must be kept alive
/// for the duration of the application so buffered logs are flushed on shutdown.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Option<WorkerGuard> {
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let (file_layer, guard) = if config.file_logging {
        if let Err(e) = fs::create_dir_all(log_dir) {
            eprintln!("Failed to create logs directory: {}", e);
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // JSON for ingestion by log tooling
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_filter(env_filter());
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(false)
        .with_filter(env_filter());

    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
    {
        eprintln!("Failed to initialize tracing subscriber: {}", e);
    }

    // Redirect standard `log` macros to `tracing`
    if let Err(e) = tracing_log::LogTracer::init() {
        log::debug!("LogTracer already installed: {}", e);
    }

    if config.file_logging {
        let log_dir = log_dir.to_path_buf();
        std::thread::spawn(move || compress_old_logs(&log_dir));
    }

    tracing::info!(
        log_dir = %log_dir.display(),
        file_logging = config.file_logging,
        "Logging initialized"
    );

    guard
}

/// Rolled files are named `clipdeck.log.YYYY-MM-DD`; today's file is still open.
fn should_compress(file_name: &str, today_suffix: &str) -> bool {
    file_name.starts_with(&format!("{LOG_FILE_NAME}."))
        && !file_name.ends_with(today_suffix)
        && !file_name.ends_with(".gz")
}

/// Compress old log files in the background
fn compress_old_logs(log_dir: &Path) {
    let today_suffix = chrono::Local::now().format("%Y-%m-%d").to_string();

    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !should_compress(name, &today_suffix) {
            continue;
        }

        match compress_file(&path) {
            Ok(gz_path) => tracing::info!(path = %gz_path.display(), "Compressed old log"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to compress old log"),
        }
    }
}

fn compress_file(path: &Path) -> io::Result<PathBuf> {
    let mut gz_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No filename"))?
        .to_os_string();
    gz_name.push(".gz");
    let gz_path = path.with_file_name(gz_name);

    if gz_path.exists() {
        return Ok(gz_path);
    }

    let mut reader = io::BufReader::new(fs::File::open(path)?);
    let mut encoder = GzEncoder::new(fs::File::create(&gz_path)?, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    encoder.finish()?;

    fs::remove_file(path)?;
    Ok(gz_path)
}
