//! Console and session-file logging

use crate::domain::settings::{LogRotation, LogSettings};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Flushes the session log file when dropped; hold it for the whole run
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Directory the session files are written to
fn log_dir(settings: &LogSettings) -> PathBuf {
    settings.log_dir.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|dir| dir.join("NB2Collector").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    })
}

fn filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: console output plus a rolling
/// `<prefix>.<date>.log` file pruned to `max_files`.
pub fn init_logger(settings: &LogSettings) -> anyhow::Result<LoggingGuard> {
    let console_layer = settings
        .console_enabled
        .then(|| fmt::layer().with_target(false).with_ansi(settings.ansi_colors));

    let mut file_guard = None;
    let mut file_dir = None;
    let file_layer = if settings.file_enabled {
        let dir = log_dir(settings);
        std::fs::create_dir_all(&dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(settings.rotation.into())
            .filename_prefix(&settings.file_name_prefix)
            .filename_suffix("log")
            .max_log_files(settings.max_files.max(1))
            .build(&dir)?;
        let (writer, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);
        file_dir = Some(dir);
        // Targets stay in the file so session lines can be traced to a module
        Some(fmt::layer().with_writer(writer).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter(settings))
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(dir) = file_dir {
        tracing::info!("Session logs in {}", dir.display());
    }

    Ok(LoggingGuard { _file: file_guard })
}
