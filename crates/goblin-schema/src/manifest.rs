use crate::types::{LineIssue, PackageName, Version};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// File name of the manifest, looked up in the working directory.
pub const MANIFEST_FILE_NAME: &str = ".goblin";

pub const ENV_PREFIX: &str = "PREFIX";
pub const ENV_OUT: &str = "OUT";
pub const DEFAULT_PREFIX: &str = "/usr/local/bin";

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid URL: '{0}'")]
    InvalidUrl(String),
    #[error("package URL has an empty path: '{0}'")]
    EmptyPackageName(String),
    #[error("package '{name}' has an empty version after '@'")]
    EmptyVersion { name: String },
    #[error("package '{name}' is already declared on line {first_line}, keeping the first declaration")]
    DuplicatePackage { name: String, first_line: usize },
    #[error(
        "setting {0} is not supported in the manifest; binaries are named after the last path segment of their URL"
    )]
    ReservedKey(String),
}

/// One package line of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredPackage {
    /// The manifest line as written, used as the fetch URL.
    pub source: String,
    pub name: PackageName,
    pub requested_version: Version,
}

impl DeclaredPackage {
    pub fn bin_name(&self) -> &str {
        self.name.bin_name()
    }

    pub fn log_label(&self) -> String {
        self.name.log_label()
    }
}

/// Variables assigned in the manifest and handed to every install script.
///
/// `PREFIX` is always present. `OUT` is never stored: it is set per package
/// when the installer runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Default for Environment {
    fn default() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(ENV_PREFIX.to_owned(), DEFAULT_PREFIX.to_owned());
        Self { vars }
    }
}

impl Environment {
    /// Set a variable. Returns `false` and leaves the map untouched for the
    /// reserved `OUT` key.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        if key == ENV_OUT {
            return false;
        }
        self.vars.insert(key.to_owned(), value.to_owned());
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn prefix(&self) -> &str {
        self.get(ENV_PREFIX).unwrap_or(DEFAULT_PREFIX)
    }

    /// Install directory: `PREFIX` as-is when absolute, otherwise relative to
    /// the directory holding the manifest.
    pub fn resolve_prefix(&self, manifest_dir: &Path) -> PathBuf {
        let prefix = Path::new(self.prefix());
        if prefix.is_absolute() {
            prefix.to_path_buf()
        } else {
            manifest_dir.join(prefix)
        }
    }
}

/// Result of parsing a manifest. Line-level problems are collected in
/// `issues` rather than failing the parse.
#[derive(Debug, Default)]
pub struct ParsedManifest {
    pub packages: Vec<DeclaredPackage>,
    pub env: Environment,
    pub issues: Vec<LineIssue<ManifestError>>,
}

static ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]+=").expect("valid regex"));
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^/?#\s]*(?P<path>[^?#\s]*)(?:\?[^#\s]*)?(?:#\S*)?$")
        .expect("valid regex")
});

pub fn parse_manifest_str(input: &str) -> ParsedManifest {
    let mut parsed = ParsedManifest::default();
    let mut first_seen: HashMap<PackageName, usize> = HashMap::new();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if ASSIGNMENT.is_match(line) {
            if let Some((key, value)) = line.split_once('=') {
                if !parsed.env.set(key, value.trim()) {
                    parsed.issues.push(LineIssue {
                        line: line_no,
                        error: ManifestError::ReservedKey(key.to_owned()),
                    });
                }
            }
            continue;
        }

        match parse_package_line(line) {
            Ok(pkg) => {
                if let Some(&first_line) = first_seen.get(&pkg.name) {
                    parsed.issues.push(LineIssue {
                        line: line_no,
                        error: ManifestError::DuplicatePackage {
                            name: pkg.name.into_inner(),
                            first_line,
                        },
                    });
                    continue;
                }
                first_seen.insert(pkg.name.clone(), line_no);
                parsed.packages.push(pkg);
            }
            Err(error) => parsed.issues.push(LineIssue {
                line: line_no,
                error,
            }),
        }
    }

    parsed
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<ParsedManifest, ManifestError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_manifest_str(&content))
}

fn parse_package_line(line: &str) -> Result<DeclaredPackage, ManifestError> {
    let caps = URL
        .captures(line)
        .ok_or_else(|| ManifestError::InvalidUrl(line.to_owned()))?;
    let path = caps.name("path").map_or("", |m| m.as_str());
    let path = path.trim_start_matches('/');

    let (name, version) = match path.split_once('@') {
        Some((name, version)) => (name, version),
        None => (path, crate::types::VERSION_LATEST),
    };
    if name.is_empty() {
        return Err(ManifestError::EmptyPackageName(line.to_owned()));
    }
    if version.is_empty() {
        return Err(ManifestError::EmptyVersion {
            name: name.to_owned(),
        });
    }

    Ok(DeclaredPackage {
        source: line.to_owned(),
        name: PackageName::new(name),
        requested_version: Version::new(version),
    })
}
