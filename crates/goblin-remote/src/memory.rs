use crate::{RemoteError, ScriptFetcher};
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves scripts from an in-memory table and records every request.
///
/// Unknown URLs fail with `RemoteError::NotFound`, which stands in for a
/// network failure in reconciliation tests.
#[derive(Default)]
pub struct MemoryFetcher {
    scripts: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(self, url: &str, script: &str) -> Self {
        self.insert(url, script);
        self
    }

    pub fn insert(&self, url: &str, script: &str) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.insert(url.to_owned(), script.to_owned());
        }
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl ScriptFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        self.requests
            .lock()
            .map_err(|e| RemoteError::Http(format!("mutex poisoned: {e}")))?
            .push(url.to_owned());
        let scripts = self
            .scripts
            .lock()
            .map_err(|e| RemoteError::Http(format!("mutex poisoned: {e}")))?;
        scripts
            .get(url)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(url.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serves_inserted_scripts() {
        let fetcher = MemoryFetcher::new().with_script("http://x/a", "echo a");
        assert_eq!(fetcher.fetch("http://x/a").unwrap(), "echo a");
        assert_eq!(fetcher.request_count(), 1);
    }

    #[test]
    fn unknown_url_is_not_found_and_still_recorded() {
        let fetcher = MemoryFetcher::new();
        assert!(matches!(
            fetcher.fetch("http://x/missing"),
            Err(RemoteError::NotFound(_))
        ));
        assert_eq!(fetcher.requests(), vec!["http://x/missing".to_owned()]);
    }
}
