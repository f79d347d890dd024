use crate::CoreError;
use serde::Serialize;

/// Where a package stands within one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageState {
    Pending,
    Resolved,
    ResolveFailed,
    CheckMismatch,
    UpToDate,
    NeedsInstall,
    Installed,
    InstallFailed,
}

impl PackageState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PackageState::ResolveFailed
                | PackageState::CheckMismatch
                | PackageState::UpToDate
                | PackageState::InstallFailed
                | PackageState::Installed
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            PackageState::ResolveFailed | PackageState::CheckMismatch | PackageState::InstallFailed
        )
    }
}

impl std::fmt::Display for PackageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageState::Pending => write!(f, "pending"),
            PackageState::Resolved => write!(f, "resolved"),
            PackageState::ResolveFailed => write!(f, "resolve-failed"),
            PackageState::CheckMismatch => write!(f, "mismatch"),
            PackageState::UpToDate => write!(f, "up-to-date"),
            PackageState::NeedsInstall => write!(f, "needs-install"),
            PackageState::Installed => write!(f, "installed"),
            PackageState::InstallFailed => write!(f, "install-failed"),
        }
    }
}

pub fn validate_transition(from: PackageState, to: PackageState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (
            PackageState::Pending,
            PackageState::Resolved | PackageState::ResolveFailed
        ) | (
            PackageState::Resolved,
            PackageState::UpToDate | PackageState::CheckMismatch | PackageState::NeedsInstall
        ) | (
            PackageState::NeedsInstall,
            PackageState::Installed | PackageState::InstallFailed
        )
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
