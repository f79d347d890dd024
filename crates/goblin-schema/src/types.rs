//! Newtype wrappers for package identifiers and version tokens.
//!
//! All newtypes serialize/deserialize as plain strings so reports and lock
//! entries stay readable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::LazyLock;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string.
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Return the inner string as a slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_newtype!(
    /// Normalized package identifier: the source URL path without its
    /// leading slash and without the `@version` suffix.
    PackageName
);

string_newtype!(
    /// A version token as written in the manifest or recorded in the lock.
    Version
);

/// Version token used when a manifest line carries no `@version` suffix.
pub const VERSION_LATEST: &str = "latest";

static COMMIT_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-f0-9]{36,}$").expect("valid regex"));
static SEMVER_TRIPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?[0-9]+\.[0-9]+\.[0-9]+$").expect("valid regex"));

impl Version {
    pub fn latest() -> Self {
        Self::new(VERSION_LATEST)
    }

    pub fn is_latest(&self) -> bool {
        self.0 == VERSION_LATEST
    }

    /// A pinned version identifies exactly one build and is never re-resolved:
    /// a three-component semantic version (optionally `v`-prefixed) or a
    /// commit-like hex token of at least 36 characters.
    pub fn is_pinned(&self) -> bool {
        is_pinned_version(&self.0)
    }
}

pub fn is_pinned_version(v: &str) -> bool {
    COMMIT_LIKE.is_match(v) || SEMVER_TRIPLE.is_match(v)
}

impl PackageName {
    /// Last path segment; the installed binary is named after it.
    pub fn bin_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// `org/pkg` for `host/org/pkg/...` names, the whole name otherwise,
    /// fitted to a fixed 24-column field.
    pub fn log_label(&self) -> String {
        const WIDTH: usize = 24;
        let parts: Vec<&str> = self.0.split('/').collect();
        let label = if parts.len() >= 3 {
            format!("{}/{}", parts[1], parts[2])
        } else {
            self.0.clone()
        };
        if label.chars().count() > WIDTH {
            let truncated: String = label.chars().take(WIDTH).collect();
            format!("{truncated}…")
        } else {
            format!("{label:<WIDTH$}")
        }
    }
}

/// A problem found on one line of a line-oriented file. Such problems never
/// abort parsing; the offending line is skipped.
#[derive(Debug)]
pub struct LineIssue<E> {
    /// 1-based line number.
    pub line: usize,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for LineIssue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.error)
    }
}
