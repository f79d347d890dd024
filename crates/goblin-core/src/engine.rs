use crate::drift::{check_package, Mismatch};
use crate::lifecycle::{validate_transition, PackageState};
use crate::resolver::Resolver;
use crate::{CoreError, PackageError};
use goblin_remote::ScriptFetcher;
use goblin_runtime::{InstallOverrides, Installer};
use goblin_schema::{
    parse_manifest_file, DeclaredPackage, Environment, LockEntry, LockFile, PackageName, Version,
    LOCK_FILE_NAME,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Central reconciliation engine.
///
/// Brings the install prefix in line with the manifest (apply mode) or
/// verifies that it already is (check mode). Packages are processed one at a
/// time in manifest order; a failing package never stops the run.
pub struct Engine {
    fetcher: Box<dyn ScriptFetcher>,
    installer: Box<dyn Installer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Apply,
    Check,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Apply => write!(f, "apply"),
            Mode::Check => write!(f, "check"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Verify only; never install or write anything.
    pub check: bool,
    /// Resolve unpinned versions by downloading install scripts.
    pub fetch: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            check: false,
            fetch: true,
        }
    }
}

impl ReconcileOptions {
    pub fn mode(&self) -> Mode {
        if self.check {
            Mode::Check
        } else {
            Mode::Apply
        }
    }
}

/// Outcome for one declared package.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub name: PackageName,
    #[serde(skip)]
    pub label: String,
    pub source: String,
    pub requested: Version,
    pub resolved: Option<Version>,
    pub state: PackageState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Mismatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_bin: Option<String>,
}

impl PackageReport {
    fn pending(pkg: &DeclaredPackage) -> Self {
        Self {
            name: pkg.name.clone(),
            label: pkg.log_label(),
            source: pkg.source.clone(),
            requested: pkg.requested_version.clone(),
            resolved: None,
            state: PackageState::Pending,
            detail: None,
            mismatch: None,
            declared_bin: None,
        }
    }

    fn advance(&mut self, to: PackageState) -> Result<(), CoreError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    fn fail(&mut self, to: PackageState, err: &PackageError) -> Result<(), CoreError> {
        self.advance(to)?;
        self.detail = Some(err.to_string());
        Ok(())
    }
}

/// Result of a full reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub mode: Mode,
    pub manifest: PathBuf,
    pub lock_file: PathBuf,
    /// Install directory after resolving a relative `PREFIX`.
    pub prefix: PathBuf,
    pub env: BTreeMap<String, String>,
    pub packages: Vec<PackageReport>,
    /// Skipped manifest and lock file lines, already rendered.
    pub issues: Vec<String>,
    pub lock_written: bool,
}

impl ReconcileReport {
    /// A run passes unless check mode found a mismatch. Fetch and install
    /// failures are reported but never fail the run.
    pub fn passed(&self) -> bool {
        !self
            .packages
            .iter()
            .any(|p| p.state == PackageState::CheckMismatch)
    }

    pub fn count(&self, state: PackageState) -> usize {
        self.packages.iter().filter(|p| p.state == state).count()
    }

    pub fn installed_count(&self) -> usize {
        self.count(PackageState::Installed)
    }

    pub fn up_to_date_count(&self) -> usize {
        self.count(PackageState::UpToDate)
    }

    pub fn failed_count(&self) -> usize {
        self.packages.iter().filter(|p| p.state.is_failure()).count()
    }
}

/// Directory holding the manifest; `.` for a bare file name.
fn manifest_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Engine {
    pub fn new(fetcher: Box<dyn ScriptFetcher>, installer: Box<dyn Installer>) -> Self {
        Self { fetcher, installer }
    }

    pub fn reconcile(
        &self,
        manifest_path: &Path,
        options: ReconcileOptions,
    ) -> Result<ReconcileReport, CoreError> {
        let mode = options.mode();
        info!("reconciling {} ({mode} mode)", manifest_path.display());

        if !manifest_path.exists() {
            return Err(CoreError::ManifestNotFound(manifest_path.to_path_buf()));
        }

        let parsed = parse_manifest_file(manifest_path)?;
        let mut issues = Vec::new();
        for issue in &parsed.issues {
            warn!("{}: {issue}", manifest_path.display());
            issues.push(format!("{}: {issue}", manifest_path.display()));
        }

        let dir = manifest_dir(manifest_path);
        let lock_path = dir.join(LOCK_FILE_NAME);
        if mode == Mode::Apply && LockFile::ensure_exists(&lock_path)? {
            debug!("created empty lock file {}", lock_path.display());
        }

        let lock_parsed = LockFile::read_from_file(&lock_path)?;
        for issue in &lock_parsed.issues {
            warn!("{}: {issue}", lock_path.display());
            issues.push(format!("{}: {issue}", lock_path.display()));
        }
        let mut lock = lock_parsed.lock;

        let prefix = parsed.env.resolve_prefix(&dir);
        if mode == Mode::Apply && !prefix.exists() {
            std::fs::create_dir_all(&prefix)?;
            debug!("created install prefix {}", prefix.display());
        }
        for (key, value) in parsed.env.iter() {
            debug!("env {key}={value}");
        }

        let mut packages = Vec::with_capacity(parsed.packages.len());
        for pkg in &parsed.packages {
            let report = self.reconcile_package(pkg, &mut lock, &parsed.env, &prefix, options)?;
            packages.push(report);
        }

        let mut lock_written = false;
        if mode == Mode::Apply {
            info!("writing lock file {}", lock_path.display());
            lock.write_to_file(&lock_path)?;
            lock_written = true;
        }

        Ok(ReconcileReport {
            mode,
            manifest: manifest_path.to_path_buf(),
            lock_file: lock_path,
            prefix,
            env: parsed.env.vars().clone(),
            packages,
            issues,
            lock_written,
        })
    }

    fn reconcile_package(
        &self,
        pkg: &DeclaredPackage,
        lock: &mut LockFile,
        env: &Environment,
        prefix: &Path,
        options: ReconcileOptions,
    ) -> Result<PackageReport, CoreError> {
        let label = pkg.log_label();
        let mut report = PackageReport::pending(pkg);

        let entry = match lock.get(&pkg.name) {
            Some(entry) => {
                debug!(
                    "{label} lock entry: desired '{}', actual '{}'",
                    entry.desired_version, entry.actual_version
                );
                entry.clone()
            }
            None => LockEntry::never_installed(pkg),
        };

        let resolver = Resolver::new(self.fetcher.as_ref());
        let resolution = match resolver.resolve(pkg, options.fetch) {
            Ok(r) => r,
            Err(e) => {
                match &e {
                    PackageError::UnresolvedVersion { .. } => warn!("{label} {e}"),
                    _ => error!("{label} {e}"),
                }
                report.fail(PackageState::ResolveFailed, &e)?;
                return Ok(report);
            }
        };
        report.advance(PackageState::Resolved)?;
        report.resolved = Some(resolution.version.clone());
        report.declared_bin.clone_from(&resolution.declared_bin);
        if let Some(bin) = &resolution.declared_bin {
            if bin != pkg.bin_name() {
                debug!(
                    "{label} script declares bin '{bin}', installing as '{}'",
                    pkg.bin_name()
                );
            }
        }

        if options.check {
            match check_package(pkg, &entry, &resolution.version, options.fetch, prefix) {
                Some(mismatch) => {
                    warn!("{label} {mismatch}");
                    report.advance(PackageState::CheckMismatch)?;
                    report.detail = Some(mismatch.to_string());
                    report.mismatch = Some(mismatch);
                }
                None => {
                    info!("{label} up to date ({})", resolution.version);
                    report.advance(PackageState::UpToDate)?;
                }
            }
            return Ok(report);
        }

        let overrides = InstallOverrides::new(prefix, pkg.bin_name());
        let target = overrides.target();
        if resolution.version == entry.actual_version {
            if target.exists() {
                info!("{label} already up to date ({})", resolution.version);
                if entry.desired_version != pkg.requested_version {
                    // Same build, new request: record the request without reinstalling.
                    lock.upsert(LockEntry::new(
                        pkg.name.clone(),
                        pkg.requested_version.clone(),
                        entry.actual_version.clone(),
                    ));
                    report.detail = Some(format!(
                        "lock file request updated from '{}'",
                        entry.desired_version
                    ));
                }
                report.advance(PackageState::UpToDate)?;
                return Ok(report);
            }
            info!(
                "{label} binary not found, reinstalling: {}",
                target.display()
            );
        }

        report.advance(PackageState::NeedsInstall)?;
        info!(
            "{label} installing {} ({}) to {}",
            pkg.source,
            resolution.version,
            target.display()
        );

        let installed = match resolution.script {
            Some(script) => Ok(script),
            None => resolver.fetch_script(pkg),
        }
        .and_then(|script| {
            self.installer
                .install(&script, env, &overrides)
                .map_err(PackageError::from)
        });

        match installed {
            Ok(()) => {
                lock.upsert(LockEntry::new(
                    pkg.name.clone(),
                    pkg.requested_version.clone(),
                    resolution.version.clone(),
                ));
                info!("{label} installed {}", resolution.version);
                report.advance(PackageState::Installed)?;
            }
            Err(e) => {
                error!("{label} {e}");
                report.fail(PackageState::InstallFailed, &e)?;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_apply_with_fetch() {
        let opts = ReconcileOptions::default();
        assert_eq!(opts.mode(), Mode::Apply);
        assert!(opts.fetch);
    }

    #[test]
    fn manifest_dir_of_bare_name_is_cwd() {
        assert_eq!(manifest_dir(Path::new(".goblin")), PathBuf::from("."));
        assert_eq!(
            manifest_dir(Path::new("/work/project/.goblin")),
            PathBuf::from("/work/project")
        );
    }

    #[test]
    fn report_passes_without_mismatches() {
        let pkg = goblin_schema::parse_manifest_str("http://example.org/pkg/a\n")
            .packages
            .remove(0);
        let mut failed = PackageReport::pending(&pkg);
        failed.state = PackageState::InstallFailed;
        let mut report = ReconcileReport {
            mode: Mode::Apply,
            manifest: PathBuf::from(".goblin"),
            lock_file: PathBuf::from(".goblin.lock"),
            prefix: PathBuf::from("/usr/local/bin"),
            env: BTreeMap::new(),
            packages: vec![failed],
            issues: Vec::new(),
            lock_written: true,
        };
        assert!(report.passed());
        assert_eq!(report.failed_count(), 1);

        report.packages[0].state = PackageState::CheckMismatch;
        assert!(!report.passed());
    }
}
