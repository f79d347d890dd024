//! Reconciliation engine for goblin.
//!
//! This crate ties together manifest and lock parsing, version resolution
//! through a `ScriptFetcher`, and script execution through an `Installer`
//! into the `Engine`, which walks every declared package through the
//! lifecycle state machine and produces a `ReconcileReport`.

pub mod drift;
pub mod engine;
pub mod lifecycle;
pub mod resolver;

pub use drift::{check_package, Mismatch};
pub use engine::{Engine, Mode, PackageReport, ReconcileOptions, ReconcileReport};
pub use lifecycle::{validate_transition, PackageState};
pub use resolver::{Resolution, Resolver};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),
    #[error("manifest error: {0}")]
    Manifest(#[from] goblin_schema::ManifestError),
    #[error("lock error: {0}")]
    Lock(#[from] goblin_schema::LockError),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end the processing of a single package. The run continues
/// with the next package.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to fetch '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: goblin_remote::RemoteError,
    },
    #[error("no version found in the install script at '{url}'")]
    UnresolvedVersion { url: String },
    #[error("install failed: {0}")]
    Install(#[from] goblin_runtime::RuntimeError),
}
