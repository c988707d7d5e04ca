//! Configuration
//!
//! Layered settings for stores, migration and logging. Sources are merged by
//! [`merge::service::MergeService`] with precedence defaults → global file →
//! `PREFSTORE__*` environment.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::migrate::TruncationLimits;
use crate::store::StoreOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrefsConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub migration: MigrationSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// How long a save waits for the cross-process lock (milliseconds)
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Delay between lock attempts (milliseconds)
    #[serde(default = "default_lock_retry_delay_ms")]
    pub lock_retry_delay_ms: u64,

    /// Preference directory; None means the platform default
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_lock_retry_delay_ms() -> u64 {
    50
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            lock_retry_delay_ms: default_lock_retry_delay_ms(),
            directory: None,
        }
    }
}

impl StoreSettings {
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            lock_retry_delay: Duration::from_millis(self.lock_retry_delay_ms.max(1)),
        }
    }
}

/// Migration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSettings {
    /// Write `<key>.truncated` markers for values the legacy backend may have cut
    #[serde(default = "default_true")]
    pub truncation_markers: bool,

    #[serde(default = "default_max_key_length")]
    pub max_key_length: usize,

    #[serde(default = "default_max_value_length")]
    pub max_value_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_key_length() -> usize {
    TruncationLimits::default().max_key_length
}

fn default_max_value_length() -> usize {
    TruncationLimits::default().max_value_length
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            truncation_markers: default_true(),
            max_key_length: default_max_key_length(),
            max_value_length: default_max_value_length(),
        }
    }
}

impl MigrationSettings {
    pub fn limits(&self) -> TruncationLimits {
        TruncationLimits {
            max_key_length: self.max_key_length,
            max_value_length: self.max_value_length,
        }
    }
}
