//! Built-in defaults, the lowest-precedence layer.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Start a builder seeded with every default value.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("store.lock_timeout_ms", 5000)?
        .set_default("store.lock_retry_delay_ms", 50)?
        .set_default("migration.truncation_markers", true)?
        .set_default("migration.max_key_length", 80)?
        .set_default("migration.max_value_length", 8192)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
