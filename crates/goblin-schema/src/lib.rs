//! Manifest parsing, lock file storage, and identifier types for goblin.
//!
//! This crate defines the schema layer: the line-oriented `.goblin` manifest
//! (`parse_manifest_str`, `ParsedManifest`), the tab-separated `.goblin.lock`
//! file (`LockFile`, `LockEntry`), and the `PackageName` / `Version` newtypes
//! along with the pinned-version rule.

pub mod lock;
pub mod manifest;
pub mod types;

pub use lock::{LockEntry, LockError, LockFile, ParsedLock, LOCK_FILE_NAME};
pub use manifest::{
    parse_manifest_file, parse_manifest_str, DeclaredPackage, Environment, ManifestError,
    ParsedManifest, DEFAULT_PREFIX, ENV_OUT, ENV_PREFIX, MANIFEST_FILE_NAME,
};
pub use types::{is_pinned_version, LineIssue, PackageName, Version, VERSION_LATEST};
