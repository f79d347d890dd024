//! Fetching of remote install scripts for goblin.
//!
//! This crate provides the `ScriptFetcher` collaborator used to download
//! install scripts (an HTTP backend built on `ureq` and an in-memory backend
//! for tests), the fetch configuration, and the extractor that reads the
//! resolved version out of a fetched script.

pub mod config;
pub mod http;
pub mod memory;
pub mod script;

pub use config::FetchConfig;
pub use http::HttpFetcher;
pub use memory::MemoryFetcher;
pub use script::{extract_script_info, ScriptInfo};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("response from {url} is not valid UTF-8")]
    InvalidBody { url: String },
    #[error("fetch config error: {0}")]
    Config(String),
}

/// Source of install scripts, keyed by the package's source URL.
pub trait ScriptFetcher: Send + Sync {
    /// Download the script text behind `url`.
    fn fetch(&self, url: &str) -> Result<String, RemoteError>;
}

impl<T: ScriptFetcher + ?Sized> ScriptFetcher for std::sync::Arc<T> {
    fn fetch(&self, url: &str) -> Result<String, RemoteError> {
        (**self).fetch(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_context() {
        let err = RemoteError::InvalidBody {
            url: "https://goblin.run/x".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "response from https://goblin.run/x is not valid UTF-8"
        );
        assert!(RemoteError::NotFound("u".to_owned())
            .to_string()
            .contains("not found"));
    }
}
