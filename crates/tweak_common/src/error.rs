//! Error types for Tweakwise.
//!
//! Probe errors are absorbed into `ReconciledTweak::probe_error` by the engine.
//! Mutation errors surface to the caller as a `Failure`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A read-only probe did not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Registry key/value or service is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// The probe itself failed (spawn error, unparseable output)
    #[error("probe failed: {0}")]
    Failed(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

impl ProbeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProbeError::NotFound(_))
    }
}

/// A write against the system failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to spawn process: {0}")]
    Spawn(String),

    #[error("mutation timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure category reported by apply/revert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    UnknownTweak,
    PermissionDenied,
    NoRevertTarget,
    OperationInProgress,
    MutationFailed,
}

/// Why apply/revert did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    #[error("unknown tweak '{0}'")]
    UnknownTweak(String),

    #[error("tweak '{0}' requires administrator rights")]
    PermissionDenied(String),

    #[error("tweak '{0}' has no default value or revert action")]
    NoRevertTarget(String),

    #[error("another operation on tweak '{0}' is still running")]
    OperationInProgress(String),

    #[error("changing tweak '{id}' failed: {detail}")]
    MutationFailed { id: String, detail: String },
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::UnknownTweak(_) => FailureKind::UnknownTweak,
            Failure::PermissionDenied(_) => FailureKind::PermissionDenied,
            Failure::NoRevertTarget(_) => FailureKind::NoRevertTarget,
            Failure::OperationInProgress(_) => FailureKind::OperationInProgress,
            Failure::MutationFailed { .. } => FailureKind::MutationFailed,
        }
    }

    /// True when the failure was raised before any system call was made
    pub fn rejected_early(&self) -> bool {
        !matches!(self, Failure::MutationFailed { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate tweak id '{0}'")]
    DuplicateId(String),

    #[error("tweak '{0}' has an empty id")]
    EmptyId(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
