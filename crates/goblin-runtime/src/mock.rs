use crate::installer::{InstallOverrides, Installer};
use crate::RuntimeError;
use goblin_schema::Environment;
use std::collections::HashSet;
use std::sync::Mutex;

/// A recorded `install` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCall {
    pub script: String,
    pub env: Environment,
    pub overrides: InstallOverrides,
}

/// Installer that never runs a shell: it records each call and creates an
/// empty `PREFIX/OUT` file so the binary-presence checks see a real install.
#[derive(Default)]
pub struct MockInstaller {
    calls: Mutex<Vec<InstallCall>>,
    failing: Mutex<HashSet<String>>,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make installs of the binary named `out` fail.
    #[must_use]
    pub fn failing_for(self, out: &str) -> Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(out.to_owned());
        }
        self
    }

    pub fn calls(&self) -> Vec<InstallCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Installer for MockInstaller {
    fn install(
        &self,
        script: &str,
        env: &Environment,
        overrides: &InstallOverrides,
    ) -> Result<(), RuntimeError> {
        self.calls
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?
            .push(InstallCall {
                script: script.to_owned(),
                env: env.clone(),
                overrides: overrides.clone(),
            });

        let fails = self
            .failing
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?
            .contains(&overrides.out);
        if fails {
            return Err(RuntimeError::ExecFailed("exit code 1".to_owned()));
        }

        std::fs::create_dir_all(&overrides.prefix)?;
        std::fs::write(overrides.target(), format!("mock-bin:{}", overrides.out))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_and_creates_binary() {
        let dir = tempfile::tempdir().unwrap();
        let installer = MockInstaller::new();
        let overrides = InstallOverrides::new(dir.path().join("bin"), "bar");

        installer
            .install("echo hi", &Environment::default(), &overrides)
            .unwrap();

        assert!(overrides.target().exists());
        let calls = installer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].script, "echo hi");
        assert_eq!(calls[0].overrides.out, "bar");
    }

    #[test]
    fn mock_failure_leaves_no_binary() {
        let dir = tempfile::tempdir().unwrap();
        let installer = MockInstaller::new().failing_for("bar");
        let overrides = InstallOverrides::new(dir.path(), "bar");

        assert!(installer
            .install("", &Environment::default(), &overrides)
            .is_err());
        assert!(!overrides.target().exists());
        assert_eq!(installer.call_count(), 1);
    }
}
