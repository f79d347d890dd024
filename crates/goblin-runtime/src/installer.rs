use crate::RuntimeError;
use goblin_schema::{Environment, ENV_OUT, ENV_PREFIX};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Shell used to run install scripts.
pub const SHELL_PATH: &str = "/bin/sh";

/// Per-package values layered over the manifest environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOverrides {
    /// Resolved install directory, exported as `PREFIX`.
    pub prefix: PathBuf,
    /// Binary name, exported as `OUT`.
    pub out: String,
}

impl InstallOverrides {
    pub fn new(prefix: impl Into<PathBuf>, out: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            out: out.into(),
        }
    }

    /// Where the script is expected to leave the binary.
    pub fn target(&self) -> PathBuf {
        self.prefix.join(&self.out)
    }
}

pub trait Installer: Send + Sync {
    /// Run one install script to completion.
    ///
    /// The script sees only `env` plus the overrides, never the caller's
    /// process environment.
    fn install(
        &self,
        script: &str,
        env: &Environment,
        overrides: &InstallOverrides,
    ) -> Result<(), RuntimeError>;
}

impl<T: Installer + ?Sized> Installer for std::sync::Arc<T> {
    fn install(
        &self,
        script: &str,
        env: &Environment,
        overrides: &InstallOverrides,
    ) -> Result<(), RuntimeError> {
        (**self).install(script, env, overrides)
    }
}

/// Runs scripts with `/bin/sh`, output going straight to the terminal.
#[derive(Debug, Default)]
pub struct ShellInstaller;

impl ShellInstaller {
    pub fn new() -> Self {
        Self
    }

    fn build_command(
        script_path: &std::path::Path,
        env: &Environment,
        overrides: &InstallOverrides,
    ) -> Command {
        let mut cmd = Command::new(SHELL_PATH);
        cmd.arg(script_path);
        cmd.env_clear();
        for (key, val) in env.iter() {
            cmd.env(key, val);
        }
        cmd.env(ENV_PREFIX, &overrides.prefix);
        cmd.env(ENV_OUT, &overrides.out);
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }
}

impl Installer for ShellInstaller {
    fn install(
        &self,
        script: &str,
        env: &Environment,
        overrides: &InstallOverrides,
    ) -> Result<(), RuntimeError> {
        let mut file = tempfile::Builder::new()
            .prefix("goblin-install-")
            .suffix(".sh")
            .tempfile()?;
        file.write_all(script.as_bytes())?;
        file.flush()?;

        tracing::debug!(
            "running {} {} (PREFIX={}, OUT={})",
            SHELL_PATH,
            file.path().display(),
            overrides.prefix.display(),
            overrides.out
        );

        let status = Self::build_command(file.path(), env, overrides)
            .status()
            .map_err(|e| RuntimeError::Launch(format!("{SHELL_PATH}: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::ExecFailed(match status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_owned(),
            }))
        }
    }
}
