//! Centralized path definitions for code-audit
//!
//! Single source of truth for the filesystem locations the tool reads and
//! writes. Nothing here consults process-wide state except
//! [`project_root_from`] and [`home_dir`], which callers invoke
//! once at start-up and then pass around through
//! [`Settings`](crate::config::Settings).
//!
//! ## Storage Layout
//!
//! ```text
//! project/                        # Project root
//! ├── .code-audit.toml            # Committed configuration
//! ├── pylintrc                    # Analyzer configuration (default location)
//! └── .code-audit/                # Local state (gitignored)
//!     └── ledger.json             # Audit targets and run history
//!
//! ~/                              # Default report directory
//! └── views_20250101_120000.html  # Generated reports
//! ```

use std::path::{Path, PathBuf};

/// Project configuration filename
pub const CONFIG_FILE: &str = ".code-audit.toml";

/// Directory name for local state
pub const STATE_DIR: &str = ".code-audit";

/// Ledger filename inside [`STATE_DIR`]
const LEDGER_FILE: &str = "ledger.json";

/// Default analyzer configuration filename
pub const DEFAULT_ANALYZER_CONFIG: &str = "pylintrc";

/// Directory name that never contains audit targets
pub const MIGRATIONS_DIR: &str = "migrations";

/// Locate the project root starting from `start`.
///
/// Walks up looking for [`CONFIG_FILE`]; falls back to the enclosing git
/// work tree, then to `start` itself.
#[must_use]
pub fn project_root_from(start: &Path) -> PathBuf {
    for dir in start.ancestors() {
        if dir.join(CONFIG_FILE).is_file() {
            return dir.to_path_buf();
        }
    }

    git2::Repository::discover(start)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| start.to_path_buf())
}

/// Path to `.code-audit.toml` under a project root
#[must_use]
pub fn config_file(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Default ledger location under a project root
#[must_use]
pub fn default_ledger(root: &Path) -> PathBuf {
    root.join(STATE_DIR).join(LEDGER_FILE)
}

/// The user's home directory; also the default report directory.
#[must_use]
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

/// Expand a leading `~/` against `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None if raw == "~" => home.to_path_buf(),
        None => PathBuf::from(raw),
    }
}

/// Anchor `path` at `root` unless it is already absolute.
#[must_use]
pub fn anchor(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
