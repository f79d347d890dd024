//! Execution layer for goblin: runs install scripts through the pluggable
//! `Installer` trait (a `/bin/sh` backend and an in-process mock) and checks
//! the host tools the published scripts rely on.

pub mod installer;
pub mod mock;
pub mod prereq;

pub use installer::{InstallOverrides, Installer, ShellInstaller};
pub use mock::MockInstaller;
pub use prereq::{check_install_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to launch installer: {0}")]
    Launch(String),
    #[error("install script failed: {0}")]
    ExecFailed(String),
}
