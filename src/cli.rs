//! CLI definitions and entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands;
use code_audit::attribution::VcsIdentity;
use code_audit::output::OutputMode;

/// Default minimum acceptable score
const DEFAULT_FAIL_UNDER: f64 = 8.0;

/// code-audit - static analysis runs with score history
#[derive(Parser, Debug)]
#[command(
    name = "code-audit",
    version,
    about = "Run a static analyzer over parts of a multi-app project",
    long_about = "Resolve a target (file, directory or bare name) across the project's \
                  first-party units, optionally narrow it to one author, run the \
                  analyzer and keep the score history."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Attribution flags shared by `audit` and `target add`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AttributionArgs {
    /// Only audit files whose content names this author or maintainer
    #[arg(long = "file-author")]
    pub file_author: Option<String>,

    /// Only audit files touched by this git user (no value: the local git user)
    #[arg(short = 'u', long = "git-user", num_args = 0..=1, default_missing_value = "")]
    pub git_user: Option<String>,
}

impl AttributionArgs {
    /// The VCS identity requested, if any
    #[must_use]
    pub fn identity(&self) -> Option<VcsIdentity> {
        self.git_user.as_deref().map(VcsIdentity::from_flag)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the analyzer once, without recording anything
    Audit {
        /// File, directory or bare name to audit (default: the whole project)
        #[arg(short, long)]
        file: Option<String>,

        #[command(flatten)]
        attribution: AttributionArgs,

        /// Fail when the score is below this value
        #[arg(long, default_value_t = DEFAULT_FAIL_UNDER)]
        fail_under: f64,

        /// Write the report here instead of the reports directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage audit targets (add, list, show, run)
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },

    /// Print the stored report of a target
    Report {
        /// Target ID
        id: u64,

        /// Which report of the last run (0-based)
        #[arg(short, long)]
        index: Option<usize>,
    },

    /// List declared application units and how they were classified
    Apps,

    /// Show version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum TargetAction {
    /// Register a new audit target
    Add {
        /// Module / unit the target belongs to
        module: String,

        /// File, directory or bare name (default: the whole project)
        #[arg(short, long)]
        file: Option<String>,

        #[command(flatten)]
        attribution: AttributionArgs,
    },

    /// List audit targets
    List,

    /// Show a target and its score history
    Show {
        /// Target ID
        id: u64,
    },

    /// Run a target and record the result
    Run {
        /// Target ID
        id: u64,

        /// Fail when the score is below this value
        #[arg(long, default_value_t = DEFAULT_FAIL_UNDER)]
        fail_under: f64,
    },
}

/// Run the CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let project = cli.project.as_deref();

    match cli.command {
        Some(Command::Audit {
            file,
            attribution,
            fail_under,
            output,
        }) => commands::audit(project, file, &attribution, fail_under, output, output_mode),
        Some(Command::Target { action }) => commands::target_cmd(project, action, output_mode),
        Some(Command::Report { id, index }) => commands::report(project, id, index, output_mode),
        Some(Command::Apps) => commands::apps(project, output_mode),
        Some(Command::Version) => {
            if output_mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": code_audit::VERSION
                    })
                );
            } else {
                println!("code-audit v{}", code_audit::VERSION);
            }
            Ok(())
        },
        None => {
            if output_mode == OutputMode::Json {
                println!(
                    "{}",
                    serde_json::json!({
                        "version": code_audit::VERSION,
                        "hint": "Use --help for usage"
                    })
                );
            } else {
                println!("code-audit v{}", code_audit::VERSION);
                println!("\nRun 'code-audit --help' for usage");
                println!("Run 'code-audit apps' to see which units will be audited");
            }
            Ok(())
        },
    }
}
