//! Error types for preference store operations.

use std::io;
use std::path::PathBuf;

/// Broad grouping of a [`PrefsError`], used by callers to decide between
/// fixing their input, retrying, or aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller mistake about the shape of the tree.
    Structural,
    /// Disk, lock or serialization failure while touching the backing file.
    Io,
    /// Failure reading a legacy preference backend during migration.
    Source,
    /// Invalid configuration or logging setup.
    Config,
}

/// Errors from preference store, facade and migration operations.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    /// A path segment names an existing scalar value, so no node can live there.
    #[error("cannot create node '{segment}': a value already exists at '{path}'")]
    NodeConflict { path: String, segment: String },

    /// The key names an existing child node, so no value can be stored there.
    #[error("cannot set value '{key}': a node already exists at '{path}'")]
    ValueConflict { path: String, key: String },

    /// The node path is malformed (empty segment, trailing separator).
    #[error("invalid preference path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The root node cannot be removed.
    #[error("cannot remove the root node")]
    RootRemoval,

    /// A preference file name was blank or otherwise unusable.
    #[error("invalid preferences name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// I/O error on the backing file, its lock file or a backup.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another writer held the save lock for longer than the configured timeout.
    #[error("timed out after {timeout_ms} ms waiting for lock on {path}")]
    LockTimeout { path: PathBuf, timeout_ms: u64 },

    /// The save was interrupted while waiting for the lock.
    #[error("interrupted while waiting for lock on {path}")]
    Interrupted { path: PathBuf },

    /// The in-memory tree could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The legacy backend failed while being read during migration.
    #[error("failed to read legacy preferences at '{path}': {source}")]
    SourceRead {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration could not be loaded or applied.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PrefsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PrefsError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PrefsError::NodeConflict { .. }
            | PrefsError::ValueConflict { .. }
            | PrefsError::InvalidPath { .. }
            | PrefsError::RootRemoval
            | PrefsError::InvalidName { .. } => ErrorCategory::Structural,
            PrefsError::Io { .. }
            | PrefsError::LockTimeout { .. }
            | PrefsError::Interrupted { .. }
            | PrefsError::Serialization(_) => ErrorCategory::Io,
            PrefsError::SourceRead { .. } => ErrorCategory::Source,
            PrefsError::Config(_) => ErrorCategory::Config,
        }
    }

    pub fn is_structural(&self) -> bool {
        self.category() == ErrorCategory::Structural
    }

    pub fn is_io(&self) -> bool {
        self.category() == ErrorCategory::Io
    }

    /// True when a save gave up waiting for another writer's lock.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PrefsError::LockTimeout { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, PrefsError::Interrupted { .. })
    }

    /// The `std::io::ErrorKind` equivalent of an I/O-category error.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            PrefsError::Io { source, .. } => Some(source.kind()),
            PrefsError::LockTimeout { .. } => Some(io::ErrorKind::TimedOut),
            PrefsError::Interrupted { .. } => Some(io::ErrorKind::Interrupted),
            PrefsError::Serialization(_) => Some(io::ErrorKind::InvalidData),
            _ => None,
        }
    }
}

impl From<PrefsError> for io::Error {
    fn from(err: PrefsError) -> Self {
        match err {
            PrefsError::Io { source, .. } => source,
            other => {
                let kind = other.io_kind().unwrap_or(io::ErrorKind::Other);
                io::Error::new(kind, other)
            }
        }
    }
}

/// Result alias for preference operations.
pub type PrefsResult<T> = Result<T, PrefsError>;
