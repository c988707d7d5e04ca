//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::PrefsConfig;
use crate::error::PrefsResult;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the global file and environment.
    pub fn load() -> PrefsResult<PrefsConfig> {
        MergeService::load()
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> PrefsResult<PrefsConfig> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> PrefsConfig {
        PrefsConfig::default()
    }
}
