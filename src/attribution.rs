//! Attribution filter
//!
//! Narrows a resolved file set to the files written or maintained by one
//! person. Two modes exist and only one applies per run:
//!
//! - **Author marker**: the file content mentions `author: NAME` or
//!   `current maintainer: NAME` (case-sensitive).
//! - **VCS user**: the file was touched by a commit from that user.
//!
//! The author marker wins when both are supplied. An empty result is
//! returned as-is; callers must treat it as "nothing to audit".

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resolver::{Origin, ResolvedFileSet, Resolver, is_auditable_source};
use crate::vcs::VersionControl;

/// Which VCS identity to attribute by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VcsIdentity {
    /// An explicit user name or email
    Explicit(String),
    /// The locally configured user
    Local,
}

impl VcsIdentity {
    /// Build from an optional-value CLI flag: an empty value means [`Self::Local`]
    #[must_use]
    pub fn from_flag(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            Self::Local
        } else {
            Self::Explicit(value.to_string())
        }
    }
}

impl std::fmt::Display for VcsIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(user) => f.write_str(user),
            Self::Local => f.write_str("<local git user>"),
        }
    }
}

/// An attribution criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// Author marker embedded in file content
    Author(String),
    /// Commit authorship
    VcsUser(VcsIdentity),
}

impl Attribution {
    /// Pick the criterion to apply; the author marker takes precedence
    #[must_use]
    pub fn select(author: Option<&str>, vcs_user: Option<VcsIdentity>) -> Option<Self> {
        match author.map(str::trim).filter(|a| !a.is_empty()) {
            Some(author) => Some(Self::Author(author.to_string())),
            None => vcs_user.map(Self::VcsUser),
        }
    }
}

/// The substrings a file must contain to count as written by `author`
#[must_use]
pub fn author_markers(author: &str) -> [String; 2] {
    [format!("author: {author}"), format!("current maintainer: {author}")]
}

/// Applies an [`Attribution`] to a resolved set
#[derive(Debug)]
pub struct AttributionFilter<'a, V: VersionControl> {
    resolver: &'a Resolver,
    vcs: &'a V,
}

impl<'a, V: VersionControl> AttributionFilter<'a, V> {
    /// Create a filter using `resolver` for source rules and path remapping
    #[must_use]
    pub const fn new(resolver: &'a Resolver, vcs: &'a V) -> Self {
        Self { resolver, vcs }
    }

    /// Narrow `candidates` to files matching `attribution`.
    ///
    /// Directories in the candidate set are expanded to their auditable
    /// sources first. The result is sorted and free of duplicates.
    pub fn apply(
        &self,
        candidates: &ResolvedFileSet,
        attribution: &Attribution,
    ) -> anyhow::Result<ResolvedFileSet> {
        let scope = self.expand(candidates);
        let matched = match attribution {
            Attribution::Author(author) => by_author(&scope, author),
            Attribution::VcsUser(identity) => self.by_vcs_user(&scope, identity)?,
        };
        log::info!("attribution kept {} of {} file(s)", matched.len(), scope.len());
        Ok(ResolvedFileSet::new(matched.into_iter().collect(), Origin::Attributed))
    }

    fn expand(&self, candidates: &ResolvedFileSet) -> BTreeSet<PathBuf> {
        candidates
            .paths()
            .iter()
            .flat_map(|p| self.resolver.sources_under(p))
            .collect()
    }

    fn by_vcs_user(
        &self,
        scope: &BTreeSet<PathBuf>,
        identity: &VcsIdentity,
    ) -> anyhow::Result<BTreeSet<PathBuf>> {
        let user = match identity {
            VcsIdentity::Explicit(user) => user.clone(),
            VcsIdentity::Local => self
                .vcs
                .configured_user()?
                .ok_or_else(|| anyhow::anyhow!("no git user.name configured"))?,
        };
        log::info!("filtering by commits from {user}");

        let suffix = self.resolver.suffix();
        let touched = self
            .vcs
            .files_touched_by(&user)?
            .into_iter()
            .filter(|path| is_auditable_source(path, suffix))
            .filter_map(|path| self.resolver.locate(&path))
            .filter(|path| path.is_file());

        let canonical_scope: BTreeSet<PathBuf> = scope.iter().map(|p| canonical(p)).collect();
        Ok(touched.filter(|path| canonical_scope.contains(&canonical(path))).collect())
    }
}

fn by_author(scope: &BTreeSet<PathBuf>, author: &str) -> BTreeSet<PathBuf> {
    let markers = author_markers(author);
    scope
        .iter()
        .filter(|path| match fs::read_to_string(path) {
            Ok(content) => markers.iter().any(|m| content.contains(m.as_str())),
            Err(e) => {
                log::warn!("could not read {}: {e}", path.display());
                false
            },
        })
        .cloned()
        .collect()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
