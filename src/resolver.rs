//! Resolver - turns target specifications into concrete files
//!
//! The Resolver takes a [`TargetSpec`] and the first-party units of the
//! project and produces the set of files (or directories) handed to the
//! analyzer. Resolution is an ordered fallback chain; each step only runs
//! when the previous one found nothing:
//!
//! 1. the spec is an existing path: use it verbatim
//! 2. the spec mentions a unit name: rebuild the path under that unit's root
//! 3. the spec has the source suffix: search every unit for that file name
//! 4. the spec has no suffix: search every unit for that directory name
//!
//! Anything under a `migrations` directory is never a target.
//!
//! # Examples
//!
//! ```no_run
//! use std::path::PathBuf;
//! use code_audit::registry::{ApplicationUnit, Provenance};
//! use code_audit::resolver::Resolver;
//! use code_audit::target::TargetSpec;
//!
//! let units = vec![ApplicationUnit {
//!     name: "billing".to_string(),
//!     root: PathBuf::from("/srv/project/billing"),
//!     provenance: Provenance::FirstParty,
//! }];
//! let resolver = Resolver::new(units, ".py");
//! let files = resolver.resolve(&TargetSpec::new("views.py")).unwrap();
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::paths::MIGRATIONS_DIR;
use crate::registry::{ApplicationUnit, Provenance};
use crate::target::TargetSpec;

/// Errors that can occur during resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every fallback step came up empty
    #[error("no file or directory matches target: {target}")]
    NotFound {
        /// The spec as given
        target: String,
    },

    /// The spec was empty
    #[error("empty target")]
    Empty,
}

/// Which step produced a resolved set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Spec was an existing path
    Direct,
    /// Spec was rebuilt under a unit root
    AppRelative,
    /// File name search across units
    NameSearch,
    /// Directory name search across units
    DirectorySearch,
    /// Every auditable source in every unit
    ProjectScan,
    /// Narrowed by an attribution filter
    Attributed,
}

/// Concrete analyzer input
///
/// Order carries no meaning; paths are de-duplicated. An empty set is a
/// valid result, distinct from a resolution error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFileSet {
    paths: Vec<PathBuf>,
    origin: Origin,
}

impl ResolvedFileSet {
    /// Build a set, dropping duplicate paths
    #[must_use]
    pub fn new(paths: Vec<PathBuf>, origin: Origin) -> Self {
        let mut seen = HashSet::new();
        let paths = paths.into_iter().filter(|p| seen.insert(p.clone())).collect();
        Self { paths, origin }
    }

    /// The member paths
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Consume into the member paths
    #[must_use]
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }

    /// Which resolution step produced this set
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set has no members
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Membership test
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Resolver over a set of first-party units
#[derive(Debug, Clone)]
pub struct Resolver {
    units: Vec<ApplicationUnit>,
    suffix: String,
}

impl Resolver {
    /// Create a resolver; units that are not first-party are ignored
    #[must_use]
    pub fn new(units: Vec<ApplicationUnit>, suffix: impl Into<String>) -> Self {
        let units = units
            .into_iter()
            .filter(|u| u.provenance == Provenance::FirstParty)
            .collect();
        Self {
            units,
            suffix: suffix.into(),
        }
    }

    /// The units searched by this resolver
    #[must_use]
    pub fn units(&self) -> &[ApplicationUnit] {
        &self.units
    }

    /// The source suffix
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Resolve a target specification
    pub fn resolve(&self, spec: &TargetSpec) -> Result<ResolvedFileSet, ResolveError> {
        if spec.as_str().is_empty() {
            return Err(ResolveError::Empty);
        }
        let not_found = || ResolveError::NotFound {
            target: spec.to_string(),
        };

        if spec.touches_migrations() {
            log::debug!("{spec} is inside a migrations directory");
            return Err(not_found());
        }

        if spec.exists() {
            log::debug!("{spec} resolved as an existing path");
            return Ok(ResolvedFileSet::new(vec![spec.as_path().to_path_buf()], Origin::Direct));
        }

        if let Some(path) = self.app_relative(spec.as_path())
            && path.exists()
        {
            log::debug!("{spec} resolved under unit root: {}", path.display());
            return Ok(ResolvedFileSet::new(vec![path], Origin::AppRelative));
        }

        let tail: PathBuf = spec.segments().into_iter().collect();
        if tail.as_os_str().is_empty() {
            return Err(not_found());
        }

        if spec.has_suffix(&self.suffix) {
            let files = self.find_files(&tail);
            if !files.is_empty() {
                log::info!("{spec} matched {} file(s)", files.len());
                return Ok(ResolvedFileSet::new(files, Origin::NameSearch));
            }
        } else {
            let dirs = self.find_dirs(&tail);
            if !dirs.is_empty() {
                log::info!("{spec} matched {} directory(ies)", dirs.len());
                return Ok(ResolvedFileSet::new(dirs, Origin::DirectorySearch));
            }
        }

        Err(not_found())
    }

    /// Rebuild `path` under the root of the first unit named in it.
    ///
    /// `billing/api/views.py` becomes `<billing root>/api/views.py`.
    /// Returns `None` for paths through `migrations` or naming no unit.
    #[must_use]
    pub fn app_relative(&self, path: &Path) -> Option<PathBuf> {
        let spec = TargetSpec::new(path.to_string_lossy());
        if spec.touches_migrations() {
            return None;
        }
        let segments = spec.segments();
        segments.iter().enumerate().find_map(|(idx, segment)| {
            let unit = self.units.iter().find(|u| u.name == *segment)?;
            Some(segments[idx + 1..].iter().fold(unit.root.clone(), |acc, s| acc.join(s)))
        })
    }

    /// Map a path reported by version control onto a unit.
    ///
    /// An absolute path already below a unit root is kept as is, minus
    /// anything inside `migrations`. Other paths go through
    /// [`Self::app_relative`].
    #[must_use]
    pub fn locate(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            let inside = self
                .units
                .iter()
                .find_map(|u| path.strip_prefix(&u.root).ok());
            if let Some(rest) = inside {
                let through_migrations = rest.components().any(|c| c.as_os_str() == MIGRATIONS_DIR);
                return (!through_migrations).then(|| path.to_path_buf());
            }
        }
        self.app_relative(path)
    }

    /// Files in any unit whose trailing components equal `tail`
    #[must_use]
    pub fn find_files(&self, tail: &Path) -> Vec<PathBuf> {
        self.walk_units()
            .filter(|e| e.file_type().is_file() && e.path().ends_with(tail))
            .map(DirEntry::into_path)
            .collect()
    }

    /// Directories below any unit root whose trailing components equal `tail`
    #[must_use]
    pub fn find_dirs(&self, tail: &Path) -> Vec<PathBuf> {
        self.walk_units()
            .filter(|e| e.depth() > 0 && e.file_type().is_dir() && e.path().ends_with(tail))
            .map(DirEntry::into_path)
            .collect()
    }

    /// Every auditable source file in every unit
    #[must_use]
    pub fn scan_sources(&self) -> ResolvedFileSet {
        let files = self
            .walk_units()
            .filter(|e| e.file_type().is_file() && is_auditable_source(e.path(), &self.suffix))
            .map(DirEntry::into_path)
            .collect();
        ResolvedFileSet::new(files, Origin::ProjectScan)
    }

    /// Auditable sources below `dir` (or `dir` itself when it is a file)
    #[must_use]
    pub fn sources_under(&self, dir: &Path) -> Vec<PathBuf> {
        if dir.is_file() {
            return vec![dir.to_path_buf()];
        }
        walk(dir)
            .filter(|e| e.file_type().is_file() && is_auditable_source(e.path(), &self.suffix))
            .map(DirEntry::into_path)
            .collect()
    }

    fn walk_units(&self) -> impl Iterator<Item = DirEntry> + '_ {
        self.units.iter().flat_map(|unit| walk(&unit.root))
    }
}

/// Whether `path` is a source file worth auditing.
///
/// Names starting with `__` (package markers, dunder modules) or `000`
/// (generated boilerplate) are skipped.
#[must_use]
pub fn is_auditable_source(path: &Path, suffix: &str) -> bool {
    path.file_name().and_then(|n| n.to_str()).is_some_and(|name| {
        name.ends_with(suffix) && !name.starts_with("__") && !name.starts_with("000")
    })
}

fn walk(root: &Path) -> impl Iterator<Item = DirEntry> + use<> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !(is_hidden(e) || is_migrations(e)))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable entry: {e}");
                None
            },
        })
}

/// Check if an entry is hidden (starts with .)
fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

fn is_migrations(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name() == MIGRATIONS_DIR
}
