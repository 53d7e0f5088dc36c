//! Application registry and scanner
//!
//! The host project declares its units (apps) through an [`AppRegistry`].
//! The [`RegistryScanner`] classifies every declared unit and hands the
//! first-party ones to the resolver. Units are rebuilt on every request;
//! nothing here is cached.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::config::{Settings, UnitConfig};
use crate::paths;

/// Directory names that mark a system-wide library installation
const LIBRARY_MARKERS: [&str; 2] = ["site-packages", "dist-packages"];

/// A unit as declared by the host environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredUnit {
    /// Unit name
    pub name: String,
    /// Filesystem root, if the unit could be located at all
    pub root: Option<PathBuf>,
}

/// Source of declared units
pub trait AppRegistry {
    /// All declared units, in declaration order
    fn declared_units(&self) -> Vec<DeclaredUnit>;
}

/// Where a unit's code comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Project code, eligible for auditing
    FirstParty,
    /// Installed under a system library path
    Vendored,
    /// The audit engine's own unit
    SelfUnit,
    /// Root missing or not locatable
    Unresolved,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstParty => write!(f, "first-party"),
            Self::Vendored => write!(f, "vendored"),
            Self::SelfUnit => write!(f, "self"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

/// A logical subdivision of the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationUnit {
    /// Unique name
    pub name: String,
    /// Absolute filesystem root
    pub root: PathBuf,
    /// First-party or not
    pub provenance: Provenance,
}

/// Registry backed by `.code-audit.toml`
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    root: PathBuf,
    units: Vec<UnitConfig>,
    discover: Vec<String>,
}

impl ConfigRegistry {
    /// Build from resolved settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            root: settings.root.clone(),
            units: settings.registry.units.clone(),
            discover: settings.registry.discover.clone(),
        }
    }

    fn discovered(&self) -> Vec<DeclaredUnit> {
        let mut found = Vec::new();
        for pattern in &self.discover {
            let full = paths::anchor(&self.root, Path::new(pattern));
            let entries = match glob::glob(&full.to_string_lossy()) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("invalid discover pattern {pattern:?}: {e}");
                    continue;
                },
            };
            for path in entries.filter_map(Result::ok) {
                if !path.is_dir() {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from)
                else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                found.push(DeclaredUnit {
                    name,
                    root: Some(path),
                });
            }
        }
        found
    }
}

impl AppRegistry for ConfigRegistry {
    fn declared_units(&self) -> Vec<DeclaredUnit> {
        let explicit = self.units.iter().map(|unit| DeclaredUnit {
            name: unit.name.clone(),
            root: unit.root.as_deref().map(|r| paths::anchor(&self.root, Path::new(r))),
        });

        let mut seen = HashSet::new();
        explicit
            .chain(self.discovered())
            .filter(|unit| seen.insert(unit.name.clone()))
            .collect()
    }
}

/// Classification of one declared unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitClassification {
    /// Unit name
    pub name: String,
    /// Root as declared, if any
    pub root: Option<PathBuf>,
    /// Result of classification
    pub provenance: Provenance,
}

/// Enumerates first-party units from an [`AppRegistry`]
#[derive(Debug)]
pub struct RegistryScanner<'a, R: AppRegistry> {
    registry: &'a R,
    self_unit: String,
    system_paths: Vec<PathBuf>,
}

impl<'a, R: AppRegistry> RegistryScanner<'a, R> {
    /// Create a scanner excluding `self_unit` and units below `system_paths`
    #[must_use]
    pub fn new(registry: &'a R, self_unit: impl Into<String>, system_paths: Vec<PathBuf>) -> Self {
        Self {
            registry,
            self_unit: self_unit.into(),
            system_paths,
        }
    }

    /// Classify every declared unit
    #[must_use]
    pub fn scan(&self) -> Vec<UnitClassification> {
        self.registry
            .declared_units()
            .into_iter()
            .map(|unit| {
                let provenance = self.classify(&unit);
                UnitClassification {
                    name: unit.name,
                    root: unit.root,
                    provenance,
                }
            })
            .collect()
    }

    /// First-party units only, in declaration order
    #[must_use]
    pub fn list_first_party_units(&self) -> Vec<ApplicationUnit> {
        self.scan()
            .into_iter()
            .filter(|c| c.provenance == Provenance::FirstParty)
            .filter_map(|c| {
                c.root.map(|root| ApplicationUnit {
                    name: c.name,
                    root,
                    provenance: Provenance::FirstParty,
                })
            })
            .collect()
    }

    fn classify(&self, unit: &DeclaredUnit) -> Provenance {
        if unit.name == self.self_unit {
            return Provenance::SelfUnit;
        }
        let Some(root) = unit.root.as_deref() else {
            return Provenance::Unresolved;
        };
        if !root.is_dir() {
            log::debug!("unit {} root {} does not exist", unit.name, root.display());
            return Provenance::Unresolved;
        }
        if self.is_system_path(root) {
            return Provenance::Vendored;
        }
        Provenance::FirstParty
    }

    fn is_system_path(&self, root: &Path) -> bool {
        if self.system_paths.iter().any(|sp| root.starts_with(sp)) {
            return true;
        }
        root.components().any(|c| match c {
            Component::Normal(part) => {
                part.to_str().is_some_and(|p| LIBRARY_MARKERS.contains(&p))
            },
            _ => false,
        })
    }
}

/// Scan the registry described by `settings`
#[must_use]
pub fn first_party_units(settings: &Settings) -> Vec<ApplicationUnit> {
    let registry = ConfigRegistry::from_settings(settings);
    scanner_for(&registry, settings).list_first_party_units()
}

/// Build a scanner over `registry` with the exclusions from `settings`
#[must_use]
pub fn scanner_for<'a, R: AppRegistry>(registry: &'a R, settings: &Settings) -> RegistryScanner<'a, R> {
    RegistryScanner::new(
        registry,
        settings.registry.self_unit.clone(),
        settings.system_paths.clone(),
    )
}
