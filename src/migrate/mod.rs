//! Legacy Migration
//!
//! One-shot transfer of a legacy hierarchical preference tree into a fresh
//! store file. Nothing is written to disk until the whole walk succeeded, and
//! an existing target file is never touched.

pub mod legacy;

pub use legacy::{InMemoryLegacySource, LegacySource, SourceError};

use crate::config::MigrationSettings;
use crate::error::{PrefsError, PrefsResult};
use crate::store::{PreferenceStore, StoreOptions};
use crate::tree::path;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix of the marker written next to a possibly truncated value.
pub const TRUNCATED_SUFFIX: &str = ".truncated";

/// Root key written when the legacy tree held nothing.
pub const MIGRATED_MARKER: &str = ".migrated";

/// Value of every marker entry.
pub const TRUE_FLAG: &str = "true";

/// Maximum key and value lengths of the legacy backend, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationLimits {
    pub max_key_length: usize,
    pub max_value_length: usize,
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self {
            max_key_length: 80,
            max_value_length: 8192,
        }
    }
}

impl TruncationLimits {
    /// A key or value sitting exactly at its limit may have been cut short.
    pub fn is_truncated(&self, key: &str, value: &str) -> bool {
        key.chars().count() == self.max_key_length
            || value.chars().count() == self.max_value_length
    }
}

/// [`TruncationLimits::is_truncated`] with the default limits.
pub fn is_truncated(key: &str, value: &str) -> bool {
    TruncationLimits::default().is_truncated(key, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// The target file already existed; nothing was done.
    AlreadyMigrated,
    Migrated,
}

/// Summary of one migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub status: MigrationStatus,
    /// Number of legacy values written.
    pub values: usize,
    /// `/`-rooted paths of values flagged as possibly truncated.
    pub truncated: Vec<String>,
    /// `/`-rooted paths of values or subtrees that clashed with an
    /// already written name and were left out.
    pub skipped: Vec<String>,
}

impl MigrationReport {
    fn new(status: MigrationStatus) -> Self {
        Self {
            status,
            values: 0,
            truncated: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Copies a legacy tree into a new store file.
#[derive(Debug, Clone)]
pub struct PreferenceMigrator {
    target: PathBuf,
    options: StoreOptions,
    truncation_markers: bool,
    limits: Option<TruncationLimits>,
}

impl PreferenceMigrator {
    /// Migrator writing to `target`, with truncation markers enabled and the
    /// source's own limits.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            options: StoreOptions::default(),
            truncation_markers: true,
            limits: None,
        }
    }

    pub fn from_settings(
        target: impl Into<PathBuf>,
        settings: &MigrationSettings,
        options: StoreOptions,
    ) -> Self {
        Self {
            target: target.into(),
            options,
            truncation_markers: settings.truncation_markers,
            limits: Some(settings.limits()),
        }
    }

    pub fn with_options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn truncation_markers(mut self, enabled: bool) -> Self {
        self.truncation_markers = enabled;
        self
    }

    /// Override the limits reported by the source.
    pub fn with_limits(mut self, limits: TruncationLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Run the migration.
    ///
    /// Source failures surface as [`PrefsError::SourceRead`]; save failures
    /// are returned as the store reported them.
    pub fn migrate(&self, source: &dyn LegacySource) -> PrefsResult<MigrationReport> {
        if self.target.exists() {
            debug!(
                "Preferences file {} already exists, skipping migration",
                self.target.display()
            );
            return Ok(MigrationReport::new(MigrationStatus::AlreadyMigrated));
        }

        info!("Migrating legacy preferences to {}", self.target.display());
        let store = PreferenceStore::open_with(&self.target, self.options.clone())?;
        let limits = self.limits.unwrap_or_else(|| source.limits());
        let mut report = MigrationReport::new(MigrationStatus::Migrated);

        self.copy_node(source, &store, "", limits, &mut report)?;

        if report.values == 0 {
            store.put("", MIGRATED_MARKER, TRUE_FLAG)?;
        }
        store.save()?;

        info!(
            "Migrated {} preference values ({} possibly truncated, {} skipped)",
            report.values,
            report.truncated.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn copy_node(
        &self,
        source: &dyn LegacySource,
        store: &PreferenceStore,
        node_path: &str,
        limits: TruncationLimits,
        report: &mut MigrationReport,
    ) -> PrefsResult<()> {
        let keys = source
            .keys(node_path)
            .map_err(|e| source_error(node_path, e))?;
        for key in keys {
            let Some(value) = source
                .get(node_path, &key)
                .map_err(|e| source_error(node_path, e))?
            else {
                continue;
            };

            if !put_or_skip(store, node_path, &key, &value, report)? {
                continue;
            }
            report.values += 1;

            if self.truncation_markers && limits.is_truncated(&key, &value) {
                let marker = format!("{}{}", key, TRUNCATED_SUFFIX);
                put_or_skip(store, node_path, &marker, TRUE_FLAG, report)?;
                report
                    .truncated
                    .push(path::absolute(&path::join(node_path, &key)));
            }
        }

        let children = source
            .children_names(node_path)
            .map_err(|e| source_error(node_path, e))?;
        for child in children {
            let child_path = path::join(node_path, &child);
            if store.get(node_path, &child).is_some() {
                warn!(
                    "Skipping legacy node '{}': a value with the same name was already migrated",
                    path::absolute(&child_path)
                );
                report.skipped.push(path::absolute(&child_path));
                continue;
            }
            self.copy_node(source, store, &child_path, limits, report)?;
        }

        Ok(())
    }
}

/// Write one value; structural conflicts are recorded and skipped.
fn put_or_skip(
    store: &PreferenceStore,
    node_path: &str,
    key: &str,
    value: &str,
    report: &mut MigrationReport,
) -> PrefsResult<bool> {
    match store.put(node_path, key, value) {
        Ok(()) => Ok(true),
        Err(e) if e.is_structural() => {
            let full = path::absolute(&path::join(node_path, key));
            warn!("Skipping legacy value '{}': {}", full, e);
            report.skipped.push(full);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

fn source_error(node_path: &str, source: SourceError) -> PrefsError {
    PrefsError::SourceRead {
        path: path::absolute(node_path),
        source,
    }
}
