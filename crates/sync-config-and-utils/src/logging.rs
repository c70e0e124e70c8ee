//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the level passed in. Events go to stderr
//! in compact form and, when a log file is given, are also appended to it as
//! one JSON object per line.

use crate::{CoreError, CoreResult};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Fails if one is already installed.
///
/// ```ignore
/// init_logging(&config.log_level, Some(&paths.log_file()))?;
/// ```
pub fn init_logging(level: &str, log_file: Option<&Path>) -> CoreResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| CoreError::Config(format!("bad log level {level:?}: {e}")))?,
    };

    let json_layer = log_file
        .map(|path| -> CoreResult<_> {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(fmt::layer()
                .json()
                .with_current_span(false)
                .with_writer(Mutex::new(file)))
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(json_layer)
        .try_init()
        .map_err(|e| CoreError::Config(format!("logger already installed: {e}")))
}
