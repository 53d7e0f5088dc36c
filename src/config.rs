//! Project configuration
//!
//! Configuration lives in `.code-audit.toml` at the project root. Every
//! field has a default, so a missing file is equivalent to an empty one.
//!
//! The raw [`Config`] is what serde sees; [`Config::resolve`] turns it into
//! [`Settings`], where every path is absolute and the home directory has
//! been looked up exactly once.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::paths;

/// Raw contents of `.code-audit.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project-wide settings
    #[serde(default)]
    pub project: ProjectConfig,
    /// Application registry
    #[serde(default)]
    pub registry: RegistryConfig,
    /// External analyzer
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    /// Report formatting filter
    #[serde(default)]
    pub formatter: FormatterConfig,
    /// Report destination
    #[serde(default)]
    pub reports: ReportsConfig,
    /// Run ledger location
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// `[project]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Suffix identifying source files
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,
}

fn default_source_suffix() -> String {
    ".py".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_suffix: default_source_suffix(),
        }
    }
}

/// `[registry]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Name of the audit engine's own unit, never audited
    #[serde(default = "default_self_unit")]
    pub self_unit: String,
    /// System-wide library installation paths; units rooted below them are vendored
    #[serde(default)]
    pub system_paths: Vec<String>,
    /// Glob patterns (relative to the project root) whose directories become units
    #[serde(default)]
    pub discover: Vec<String>,
    /// Explicitly declared units
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

fn default_self_unit() -> String {
    "code_audit".to_string()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            self_unit: default_self_unit(),
            system_paths: Vec::new(),
            discover: Vec::new(),
            units: Vec::new(),
        }
    }
}

/// `[[registry.units]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Unit name (unique)
    pub name: String,
    /// Root directory; relative paths are anchored at the project root.
    /// A unit without a root cannot be located and is treated as third-party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

/// `[analyzer]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Analyzer executable
    #[serde(default = "default_analyzer_program")]
    pub program: String,
    /// Extra arguments placed before the file list
    #[serde(default)]
    pub args: Vec<String>,
    /// Flag introducing the analyzer configuration file
    #[serde(default = "default_config_flag")]
    pub config_flag: String,
    /// Analyzer configuration file, relative to the project root
    #[serde(default = "default_config_path")]
    pub config_path: String,
    /// Exit codes treated as success
    #[serde(default = "default_success_codes")]
    pub success_codes: Vec<i32>,
    /// Exit-code bits that only report emitted messages (0 disables the check)
    #[serde(default = "default_message_status_mask")]
    pub message_status_mask: i32,
}

fn default_analyzer_program() -> String {
    "pylint".to_string()
}

fn default_config_flag() -> String {
    "--rcfile".to_string()
}

fn default_config_path() -> String {
    paths::DEFAULT_ANALYZER_CONFIG.to_string()
}

fn default_success_codes() -> Vec<i32> {
    vec![0, 32]
}

const fn default_message_status_mask() -> i32 {
    2 | 4 | 8 | 16
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: default_analyzer_program(),
            args: Vec::new(),
            config_flag: default_config_flag(),
            config_path: default_config_path(),
            success_codes: default_success_codes(),
            message_status_mask: default_message_status_mask(),
        }
    }
}

/// `[formatter]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Whether analyzer output is piped through the formatter
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Formatter executable
    #[serde(default = "default_formatter_program")]
    pub program: String,
    /// Formatter arguments
    #[serde(default)]
    pub args: Vec<String>,
}

const fn default_true() -> bool {
    true
}

fn default_formatter_program() -> String {
    "pylint_report".to_string()
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_formatter_program(),
            args: Vec::new(),
        }
    }
}

/// `[reports]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// Destination directory; defaults to the home directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Report file extension
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    ".html".to_string()
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: default_extension(),
        }
    }
}

/// `[ledger]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger file; defaults to `.code-audit/ledger.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Config {
    /// Load the configuration for a project root.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = paths::config_file(root);
        if !path.exists() {
            log::debug!("no {} under {}, using defaults", paths::CONFIG_FILE, root.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve into [`Settings`] anchored at `root`
    #[must_use]
    pub fn resolve(&self, root: &Path) -> Settings {
        let home = paths::home_dir();
        let report_dir = self
            .reports
            .dir
            .as_deref()
            .map_or_else(|| home.clone(), |dir| paths::expand_home(dir, &home));
        let system_paths = self
            .registry
            .system_paths
            .iter()
            .map(|p| paths::expand_home(p, &home))
            .collect();

        let ledger_path = self
            .ledger
            .path
            .as_deref()
            .map_or_else(|| paths::default_ledger(root), |p| paths::anchor(root, Path::new(p)));

        let formatter = self.formatter.enabled.then(|| ProgramSpec {
            program: self.formatter.program.clone(),
            args: self.formatter.args.clone(),
        });

        Settings {
            root: root.to_path_buf(),
            source_suffix: self.project.source_suffix.clone(),
            registry: self.registry.clone(),
            system_paths,
            analyzer: AnalyzerSettings {
                analyzer: ProgramSpec {
                    program: self.analyzer.program.clone(),
                    args: self.analyzer.args.clone(),
                },
                config_flag: self.analyzer.config_flag.clone(),
                config_path: paths::anchor(root, Path::new(&self.analyzer.config_path)),
                formatter,
                success_codes: self.analyzer.success_codes.clone(),
                message_status_mask: self.analyzer.message_status_mask,
            },
            report_dir: paths::anchor(root, &report_dir),
            report_extension: self.reports.extension.clone(),
            ledger_path,
        }
    }
}

/// An executable with its fixed arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    /// Executable name or path
    pub program: String,
    /// Arguments passed before any per-run arguments
    pub args: Vec<String>,
}

/// Everything the analyzer invoker needs, fully resolved
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Analyzer command
    pub analyzer: ProgramSpec,
    /// Flag introducing the configuration file
    pub config_flag: String,
    /// Absolute path of the analyzer configuration
    pub config_path: PathBuf,
    /// Optional formatting filter
    pub formatter: Option<ProgramSpec>,
    /// Exit codes treated as success
    pub success_codes: Vec<i32>,
    /// Exit-code bits that only report emitted messages
    pub message_status_mask: i32,
}

impl AnalyzerSettings {
    /// Whether an analyzer exit code counts as a successful run
    #[must_use]
    pub fn is_success(&self, code: i32) -> bool {
        if self.success_codes.contains(&code) {
            return true;
        }
        self.message_status_mask != 0 && code > 0 && code & !self.message_status_mask == 0
    }
}

/// Resolved configuration for one process
#[derive(Debug, Clone)]
pub struct Settings {
    /// Project root
    pub root: PathBuf,
    /// Source file suffix (e.g. `.py`)
    pub source_suffix: String,
    /// Registry declaration
    pub registry: RegistryConfig,
    /// System library paths, home-expanded
    pub system_paths: Vec<PathBuf>,
    /// Analyzer settings
    pub analyzer: AnalyzerSettings,
    /// Directory for generated reports
    pub report_dir: PathBuf,
    /// Extension for generated reports
    pub report_extension: String,
    /// Ledger file
    pub ledger_path: PathBuf,
}

impl Settings {
    /// Load and resolve the configuration for a project root
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        Ok(Config::load(root)?.resolve(root))
    }
}
