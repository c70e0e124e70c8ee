//! Configuration, paths, and logging for the sync queue tools.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_CHECKOUT_BACKOFF_MS, DEFAULT_CHECKOUT_BUDGET_MS, DEFAULT_CHECKOUT_SIZE,
    DEFAULT_CODEC, DEFAULT_LOCK_TIMEOUT_SECS, DEFAULT_LOCK_TTL_SECS, DEFAULT_LOG_LEVEL,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
