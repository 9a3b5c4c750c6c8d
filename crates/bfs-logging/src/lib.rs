use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use tracing::{debug, error, info, instrument, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    #[default]
    Hourly,
    Daily,
    Never,
}

impl From<Rotation> for rolling::Rotation {
    fn from(r: Rotation) -> Self {
        match r {
            Rotation::Hourly => rolling::Rotation::HOURLY,
            Rotation::Daily => rolling::Rotation::DAILY,
            Rotation::Never => rolling::Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. `info` or `bfs_directory=debug,info`.
    /// `RUST_LOG` overrides it when set.
    pub level: String,

    /// Directory for rolling log files. Console only when unset.
    pub log_dir: Option<PathBuf>,

    pub file_prefix: String,

    pub rotation: Rotation,

    pub json_format: bool,

    pub console_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".into(),
            log_dir: None,
            file_prefix: "bfs-directory".into(),
            rotation: Rotation::default(),
            json_format: false,
            console_output: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {0:?}: {1}")]
    Filter(String, String),
    #[error("cannot create log file appender in {0:?}: {1}")]
    Appender(PathBuf, String),
    #[error("global subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

type BoxedLayer<S> = Box<dyn tracing_subscriber::Layer<S> + Send + Sync>;

/// Install the global subscriber. Call once at startup and keep the returned
/// guard alive for as long as file logging should flush.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::Filter(config.level.clone(), e.to_string()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    let console_layer: Option<BoxedLayer<_>> = match (config.console_output, config.json_format) {
        (false, _) => None,
        (true, true) => Some(Box::new(fmt::layer().json())),
        (true, false) => Some(Box::new(fmt::layer())),
    };

    let (file_layer, guard): (Option<BoxedLayer<_>>, Option<WorkerGuard>) =
        match config.log_dir {
            Some(ref log_dir) => {
                let appender = rolling::RollingFileAppender::builder()
                    .rotation(config.rotation.into())
                    .filename_prefix(&config.file_prefix)
                    .filename_suffix("log")
                    .build(log_dir)
                    .map_err(|e| LoggingError::Appender(log_dir.clone(), e.to_string()))?;
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer: BoxedLayer<_> = if config.json_format {
                    Box::new(fmt::layer().json().with_writer(writer))
                } else {
                    Box::new(fmt::layer().with_ansi(false).with_writer(writer))
                };
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

    registry
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    Ok(guard)
}
