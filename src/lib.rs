//! Prefstore: File-Backed Hierarchical Preferences
//!
//! A tree of string preferences persisted as a single JSON document. Saves are
//! atomic and serialized across processes with an advisory lock file, corrupt
//! files are backed up and replaced by an empty tree, and a migrator copies
//! legacy preference trees into a fresh file.

pub mod config;
pub mod error;
pub mod logging;
pub mod migrate;
pub mod preferences;
pub mod registry;
pub mod store;
pub mod tree;

pub use error::{ErrorCategory, PrefsError, PrefsResult};
pub use migrate::{
    InMemoryLegacySource, LegacySource, MigrationReport, MigrationStatus, PreferenceMigrator,
    TruncationLimits,
};
pub use preferences::PreferenceNode;
pub use registry::PreferenceRegistry;
pub use store::{InterruptFlag, PreferenceStore, StoreOptions};
