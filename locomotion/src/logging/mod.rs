pub mod config;
pub mod macros;

pub use config::{init_logging, install, LogConfig};
pub use tracing::{debug, error, event, info, trace, warn, Level};

use once_cell::sync::Lazy;
use std::sync::OnceLock;

/// Scope names accepted in `LOCOMOTION_LOG`, one per subsystem.
pub const SCOPE_TELEPORT: &str = "teleport";
pub const SCOPE_CLIMB: &str = "climb";
pub const SCOPE_VIGNETTE: &str = "vignette";
pub const SCOPE_POOL: &str = "pool";
pub const SCOPE_AVATAR: &str = "avatar";
pub const SCOPE_PHYSICS: &str = "physics";

static LOG_CONFIG: OnceLock<LogConfig> = OnceLock::new();
static DEFAULT_CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::default);

pub fn get_log_config() -> &'static LogConfig {
    LOG_CONFIG.get().unwrap_or(&DEFAULT_CONFIG)
}

pub(crate) fn set_log_config(config: LogConfig) {
    LOG_CONFIG.set(config).ok();
}
