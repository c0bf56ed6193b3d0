//! Console logging, plus a plain-text copy in the log file when one is
//! configured. `RUST_LOG` overrides the configured level.

use crate::error::{HarnessError, HarnessResult};
use client::Settings;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_NAME: &str = "api_tests_uat.log";

pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Directory and file name for the appender.
fn log_file_parts(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_NAME)
        .to_string();
    (dir, name)
}

/// Installs the global subscriber. Keep the returned guard alive until exit
/// or buffered file lines are lost.
pub fn init_logging(settings: &Settings) -> HarnessResult<Option<WorkerGuard>> {
    let filter = env_filter(&settings.log_level);
    let console = fmt::layer().with_target(false);

    match &settings.log_file {
        Some(path) => {
            let (dir, name) = log_file_parts(path);
            std::fs::create_dir_all(&dir)?;
            let (writer, guard) = non_blocking(rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| HarnessError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .try_init()
                .map_err(|e| HarnessError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}
