use crate::PackageError;
use goblin_remote::{extract_script_info, ScriptFetcher};
use goblin_schema::{DeclaredPackage, Version};
use tracing::debug;

/// Outcome of resolving one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: Version,
    /// The install script, when resolution had to download it.
    pub script: Option<String>,
    /// `bin=` value declared by the script, if any.
    pub declared_bin: Option<String>,
}

/// Turns a requested version into a concrete one.
///
/// Pinned versions are trusted as-is. Anything else (`latest`, ranges,
/// branch names) is resolved by downloading the install script and reading
/// the version it would install.
pub struct Resolver<'a> {
    fetcher: &'a dyn ScriptFetcher,
}

impl<'a> Resolver<'a> {
    pub fn new(fetcher: &'a dyn ScriptFetcher) -> Self {
        Self { fetcher }
    }

    pub fn resolve(
        &self,
        pkg: &DeclaredPackage,
        allow_fetch: bool,
    ) -> Result<Resolution, PackageError> {
        if !allow_fetch || pkg.requested_version.is_pinned() {
            debug!(
                "{} using requested version '{}' without fetching",
                pkg.log_label(),
                pkg.requested_version
            );
            return Ok(Resolution {
                version: pkg.requested_version.clone(),
                script: None,
                declared_bin: None,
            });
        }

        let script = self.fetch_script(pkg)?;
        let info = extract_script_info(&script);
        let Some(version) = info.version else {
            return Err(PackageError::UnresolvedVersion {
                url: pkg.source.clone(),
            });
        };
        debug!("{} resolved '{}' to '{version}'", pkg.log_label(), pkg.requested_version);

        Ok(Resolution {
            version: Version::new(version),
            script: Some(script),
            declared_bin: info.bin,
        })
    }

    /// Download the install script for `pkg`.
    pub fn fetch_script(&self, pkg: &DeclaredPackage) -> Result<String, PackageError> {
        self.fetcher
            .fetch(&pkg.source)
            .map_err(|source| PackageError::Fetch {
                url: pkg.source.clone(),
                source,
            })
    }
}
