use crate::RemoteError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings for the HTTP fetcher.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FetchConfig {
    /// Upper bound for a whole request, connect through body.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("goblin/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Load config from `~/.config/goblin/config.json`, falling back to the
    /// defaults when the file does not exist.
    pub fn load_default() -> Result<Self, RemoteError> {
        let path = default_config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, RemoteError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| RemoteError::Config(format!("invalid config {}: {e}", path.display())))
    }
}

fn default_config_path() -> Result<PathBuf, RemoteError> {
    let home = std::env::var("HOME").map_err(|_| RemoteError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/goblin/config.json"))
}
