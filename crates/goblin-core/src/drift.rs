use goblin_schema::{DeclaredPackage, LockEntry, Version};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Why a package fails verification in check mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// The manifest asks for a different version than the lock recorded.
    DesiredChanged { locked: Version, requested: Version },
    /// The lock knows the package but nothing was ever installed.
    NeverInstalled { requested: Version },
    /// Upstream now resolves to a different version than the one installed.
    NewerAvailable { installed: Version, resolved: Version },
    BinaryMissing { path: PathBuf },
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mismatch::DesiredChanged { locked, requested } => write!(
                f,
                "lock file version '{locked}' does not match requested version '{requested}'"
            ),
            Mismatch::NeverInstalled { requested } => write!(
                f,
                "lock file matches requested version '{requested}' but records no install"
            ),
            Mismatch::NewerAvailable {
                installed,
                resolved,
            } => write!(
                f,
                "resolved version '{resolved}' differs from installed version '{installed}'"
            ),
            Mismatch::BinaryMissing { path } => {
                write!(f, "binary not found: {}", path.display())
            }
        }
    }
}

/// Verify one package against its lock entry without touching anything.
///
/// Conditions are tested in a fixed order and the first hit is returned.
/// The resolved version is only compared when `allow_fetch` is set, since
/// otherwise it is just the requested version echoed back.
pub fn check_package(
    pkg: &DeclaredPackage,
    entry: &LockEntry,
    resolved: &Version,
    allow_fetch: bool,
    prefix: &Path,
) -> Option<Mismatch> {
    if entry.desired_version != pkg.requested_version {
        return Some(Mismatch::DesiredChanged {
            locked: entry.desired_version.clone(),
            requested: pkg.requested_version.clone(),
        });
    }
    if !entry.is_installed() {
        return Some(Mismatch::NeverInstalled {
            requested: pkg.requested_version.clone(),
        });
    }
    if allow_fetch && *resolved != entry.actual_version {
        return Some(Mismatch::NewerAvailable {
            installed: entry.actual_version.clone(),
            resolved: resolved.clone(),
        });
    }
    let path = prefix.join(pkg.bin_name());
    if !path.exists() {
        return Some(Mismatch::BinaryMissing { path });
    }
    None
}
