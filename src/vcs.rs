//! Version control port and its git implementation
//!
//! Attribution by VCS authorship only needs two questions answered: who is
//! the locally configured user, and which files did a given author touch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use git2::{Commit, DiffOptions, Repository, Sort};

/// Version control system abstraction
pub trait VersionControl {
    /// The locally configured user name, if any
    fn configured_user(&self) -> anyhow::Result<Option<String>>;

    /// Every file touched by commits whose author matches, relative to the
    /// repository root
    ///
    /// `author` is matched as a case-sensitive substring of `Name <email>`.
    fn files_touched_by(&self, author: &str) -> anyhow::Result<Vec<PathBuf>>;
}

/// Git-based version control implementation
#[derive(Debug, Clone)]
pub struct GitVersionControl {
    /// Directory inside the repository
    workdir: PathBuf,
}

impl GitVersionControl {
    /// Create a git adapter for the repository containing `workdir`
    #[must_use]
    pub const fn new(workdir: PathBuf) -> Self {
        Self { workdir }
    }

    fn open(&self) -> anyhow::Result<Repository> {
        Repository::discover(&self.workdir)
            .with_context(|| format!("not a git repository: {}", self.workdir.display()))
    }
}

impl VersionControl for GitVersionControl {
    fn configured_user(&self) -> anyhow::Result<Option<String>> {
        let config = match self.open() {
            Ok(repo) => repo.config()?,
            Err(_) => git2::Config::open_default()?,
        };
        Ok(config.get_string("user.name").ok().filter(|name| !name.trim().is_empty()))
    }

    fn files_touched_by(&self, author: &str) -> anyhow::Result<Vec<PathBuf>> {
        let repo = self.open()?;
        if repo.is_bare() {
            anyhow::bail!("bare repositories are not supported");
        }

        if repo.head().is_err() {
            log::debug!("repository has no commits yet");
            return Ok(Vec::new());
        }

        let mut walk = repo.revwalk()?;
        walk.push_head()?;
        walk.set_sorting(Sort::TIME)?;

        let mut touched = BTreeSet::new();
        for oid in walk {
            let commit = repo.find_commit(oid?)?;
            if !authored_by(&commit, author) {
                continue;
            }
            for path in changed_paths(&repo, &commit)? {
                touched.insert(path);
            }
        }

        log::debug!("{} file(s) touched by {author}", touched.len());
        Ok(touched.into_iter().collect())
    }
}

fn authored_by(commit: &Commit<'_>, author: &str) -> bool {
    let signature = commit.author();
    let ident = format!(
        "{} <{}>",
        signature.name().unwrap_or_default(),
        signature.email().unwrap_or_default()
    );
    ident.contains(author)
}

fn changed_paths(repo: &Repository, commit: &Commit<'_>) -> anyhow::Result<Vec<PathBuf>> {
    let tree = commit.tree()?;
    let parent_tree = match commit.parents().next() {
        Some(parent) => Some(parent.tree()?),
        None => None,
    };

    let mut opts = DiffOptions::new();
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
    Ok(diff
        .deltas()
        .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
        .map(Path::to_path_buf)
        .collect())
}
