//! MergeService: orchestrates sources, applies merge policy, deserializes to PrefsConfig.

use crate::config::sources::{environment, global_file};
use crate::config::PrefsConfig;
use crate::error::{PrefsError, PrefsResult};
use config::{ConfigError, File};
use std::path::Path;

use super::policy;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Load config from standard sources.
    /// Precedence: defaults (lowest) -> global file -> environment (highest).
    pub fn load() -> PrefsResult<PrefsConfig> {
        Self::build(global_file::add_to_builder)
    }

    /// Load config from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> PrefsResult<PrefsConfig> {
        if !path.exists() {
            return Err(PrefsError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Self::build(|builder| Ok(builder.add_source(File::from(path).required(true))))
    }

    fn build<F>(add_files: F) -> PrefsResult<PrefsConfig>
    where
        F: FnOnce(
            config::ConfigBuilder<config::builder::DefaultState>,
        ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError>,
    {
        let merged: Result<PrefsConfig, ConfigError> = policy::builder_with_defaults()
            .and_then(add_files)
            .and_then(environment::add_to_builder)
            .and_then(|builder| builder.build())
            .and_then(|config| config.try_deserialize());
        merged.map_err(|e| PrefsError::Config(format!("Failed to load configuration: {}", e)))
    }
}
