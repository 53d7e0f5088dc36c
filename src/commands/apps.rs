//! Apps command - show how declared units were classified

use std::path::Path;

use code_audit::output::{OutputMode, UnitListResult};
use code_audit::registry::{ConfigRegistry, scanner_for};

use super::load_settings;

/// List declared units with their provenance
pub fn apps(project: Option<&Path>, mode: OutputMode) -> anyhow::Result<()> {
    let settings = load_settings(project)?;
    let registry = ConfigRegistry::from_settings(&settings);

    let result = UnitListResult {
        units: scanner_for(&registry, &settings).scan(),
    };
    result.render(mode);
    Ok(())
}
