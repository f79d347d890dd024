use crate::manifest::DeclaredPackage;
use crate::types::{LineIssue, PackageName, Version};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;

/// File name of the lock file, a sibling of the manifest.
pub const LOCK_FILE_NAME: &str = ".goblin.lock";

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid lock file entry, expected 3 tab-separated fields but found {found}: '{line}'")]
    FieldCount { found: usize, line: String },
    #[error("duplicate lock file entry for '{name}', keeping the first one")]
    DuplicateEntry { name: String },
}

/// What the manifest asked for and what was actually installed for one
/// package.
///
/// The desired version can be a pattern such as `latest`; the actual version
/// is what it resolved to. An empty actual version means the package was
/// never installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockEntry {
    pub name: PackageName,
    pub desired_version: Version,
    pub actual_version: Version,
}

impl LockEntry {
    pub fn new(
        name: impl Into<PackageName>,
        desired_version: impl Into<Version>,
        actual_version: impl Into<Version>,
    ) -> Self {
        Self {
            name: name.into(),
            desired_version: desired_version.into(),
            actual_version: actual_version.into(),
        }
    }

    /// Entry assumed for a declared package the lock knows nothing about.
    pub fn never_installed(pkg: &DeclaredPackage) -> Self {
        Self::new(
            pkg.name.clone(),
            pkg.requested_version.clone(),
            String::new(),
        )
    }

    pub fn is_installed(&self) -> bool {
        !self.actual_version.is_empty()
    }

    fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\n",
            self.name, self.desired_version, self.actual_version
        )
    }
}

/// The full set of lock entries, unique by package name and kept sorted by
/// name so the serialized file is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockFile {
    entries: BTreeMap<PackageName, LockEntry>,
}

/// Result of parsing a lock file. Malformed records are collected in
/// `issues` and left out of `lock`.
#[derive(Debug, Default)]
pub struct ParsedLock {
    pub lock: LockFile,
    pub issues: Vec<LineIssue<LockError>>,
}

impl LockFile {
    pub fn from_entries(entries: impl IntoIterator<Item = LockEntry>) -> Self {
        let mut lock = Self::default();
        for entry in entries {
            lock.upsert(entry);
        }
        lock
    }

    pub fn get(&self, name: &PackageName) -> Option<&LockEntry> {
        self.entries.get(name)
    }

    /// Insert the entry, replacing any entry with the same name.
    pub fn upsert(&mut self, entry: LockEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    /// Entries in name order.
    pub fn entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn parse_str(input: &str) -> ParsedLock {
        let mut parsed = ParsedLock::default();

        for (idx, raw) in input.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let [name, desired, actual] = fields[..] else {
                parsed.issues.push(LineIssue {
                    line: line_no,
                    error: LockError::FieldCount {
                        found: fields.len(),
                        line: line.to_owned(),
                    },
                });
                continue;
            };

            let name = PackageName::new(name);
            if parsed.lock.entries.contains_key(&name) {
                parsed.issues.push(LineIssue {
                    line: line_no,
                    error: LockError::DuplicateEntry {
                        name: name.into_inner(),
                    },
                });
                continue;
            }
            parsed
                .lock
                .upsert(LockEntry::new(name, desired, actual));
        }

        parsed
    }

    pub fn to_lock_string(&self) -> String {
        self.entries().map(LockEntry::to_line).collect()
    }

    /// Read the lock file. A file that does not exist reads as an empty lock.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<ParsedLock, LockError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse_str(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ParsedLock::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the lock file with the current entries, sorted by name.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = self.to_lock_string();
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        // Fsync parent directory to ensure rename durability on power loss.
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        Ok(())
    }

    /// Create an empty lock file when none exists. Returns `true` if a file
    /// was created.
    pub fn ensure_exists(path: impl AsRef<Path>) -> Result<bool, LockError> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(false);
        }
        fs::File::create(path)?;
        Ok(true)
    }
}
