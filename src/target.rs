//! Target specifications
//!
//! A target specification is whatever the user typed to say what to audit:
//! a path, a bare filename such as `views.py`, or a directory name such as
//! `api`. The spec is immutable; the helpers below only classify it.
//!
//! # Examples
//!
//! ```
//! use code_audit::target::TargetSpec;
//!
//! let spec = TargetSpec::new("views.py");
//! assert!(spec.is_bare_filename(".py"));
//!
//! let spec = TargetSpec::new("billing/api");
//! assert!(!spec.is_bare_dir_name(".py"));
//! assert_eq!(spec.segments(), vec!["billing", "api"]);
//! ```

use std::path::{Component, Path};

use crate::paths::MIGRATIONS_DIR;

/// A user-supplied target specification
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetSpec {
    raw: String,
}

impl TargetSpec {
    /// Wrap a raw specification (surrounding whitespace is dropped)
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into().trim().to_string(),
        }
    }

    /// The raw value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The spec as a path
    #[must_use]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.raw)
    }

    /// Whether the spec names something that exists on disk
    #[must_use]
    pub fn exists(&self) -> bool {
        !self.raw.is_empty() && self.as_path().exists()
    }

    /// Whether the spec ends with the source suffix
    #[must_use]
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.raw.ends_with(suffix)
    }

    /// Whether the spec contains a path separator
    #[must_use]
    pub fn has_separator(&self) -> bool {
        self.raw.contains('/') || self.raw.contains(std::path::MAIN_SEPARATOR)
    }

    /// A filename without directories, carrying the source suffix
    #[must_use]
    pub fn is_bare_filename(&self, suffix: &str) -> bool {
        !self.raw.is_empty() && !self.has_separator() && self.has_suffix(suffix)
    }

    /// A single name without the source suffix (most likely a directory)
    #[must_use]
    pub fn is_bare_dir_name(&self, suffix: &str) -> bool {
        !self.raw.is_empty() && !self.has_separator() && !self.has_suffix(suffix)
    }

    /// Normal path segments, in order (`.`/`..`/root are dropped)
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        self.as_path()
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect()
    }

    /// Whether any segment is a migrations directory
    #[must_use]
    pub fn touches_migrations(&self) -> bool {
        self.segments().contains(&MIGRATIONS_DIR)
    }

    /// Last segment without the source suffix, used to name reports
    #[must_use]
    pub fn stem(&self, suffix: &str) -> Option<&str> {
        let last = *self.segments().last()?;
        Some(last.strip_suffix(suffix).unwrap_or(last))
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for TargetSpec {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
