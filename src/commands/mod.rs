//! Command implementations

mod apps;
mod audit;
mod report;
mod target;

use std::path::Path;

use code_audit::config::Settings;
use code_audit::paths;

pub use apps::apps;
pub use audit::audit;
pub use report::report;
pub use target::target_cmd;

/// Locate the project root and load its settings
fn load_settings(project: Option<&Path>) -> anyhow::Result<Settings> {
    let start = match project {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let root = paths::project_root_from(&start);
    log::debug!("project root: {}", root.display());
    Settings::load(&root)
}
