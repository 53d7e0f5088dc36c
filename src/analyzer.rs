//! Analyzer invoker
//!
//! Runs the external analyzer over a resolved file set and writes the
//! (optionally formatted) report to a destination file.
//!
//! The analyzer and the formatter are two separate processes built from
//! argument vectors; the analyzer's stdout is wired straight into the
//! formatter's stdin. No shell is involved, so paths with spaces or shell
//! metacharacters reach the analyzer untouched.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::LazyLock;
use std::thread;

use regex::Regex;
use thiserror::Error;

use crate::config::{AnalyzerSettings, ProgramSpec};
use crate::resolver::ResolvedFileSet;

static SCORE_SPAN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"<span class="score">\s*([0-9.]+)\s*</span>"#).ok());

static RATED_AT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"rated at (-?[0-9]+(?:\.[0-9]+)?)/10").ok());

/// Errors raised while invoking the analyzer
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The analyzer configuration file does not exist
    #[error("analyzer configuration not found at {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The resolved set was empty
    #[error("no files to analyze")]
    NoInput,

    /// A process could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A process exited with a code outside the success set
    #[error("{program} exited with status {code}: {stderr}")]
    Execution {
        /// Program name
        program: String,
        /// Exit code (-1 when killed by a signal)
        code: i32,
        /// Captured standard error
        stderr: String,
    },

    /// The report could not be written
    #[error("failed to write report {}: {source}", .path.display())]
    ReportWrite {
        /// Report path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The report vanished or became unreadable after generation
    #[error("report {} is unreadable: {source}", .path.display())]
    ReportUnreadable {
        /// Report path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Other I/O while talking to a child process
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result of one analyzer run
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Where the report was written
    pub report_path: PathBuf,
    /// Report text as written
    pub raw_output: String,
    /// Analyzer exit code
    pub exit_code: i32,
}

/// Runs the configured analyzer
#[derive(Debug, Clone)]
pub struct AnalyzerInvoker {
    settings: AnalyzerSettings,
}

impl AnalyzerInvoker {
    /// Create an invoker
    #[must_use]
    pub const fn new(settings: AnalyzerSettings) -> Self {
        Self { settings }
    }

    /// The settings in use
    #[must_use]
    pub const fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Analyze `files`, writing the report to `destination`.
    ///
    /// Blocks until both processes exit.
    pub fn invoke(
        &self,
        files: &ResolvedFileSet,
        destination: &Path,
    ) -> Result<Invocation, AnalyzeError> {
        let config_path = &self.settings.config_path;
        if !config_path.is_file() {
            return Err(AnalyzeError::ConfigNotFound(config_path.clone()));
        }
        if files.is_empty() {
            return Err(AnalyzeError::NoInput);
        }

        let mut analyzer = self.analyzer_command(files);
        log::info!("running {} on {} path(s)", self.settings.analyzer.program, files.len());
        log::debug!("command: {analyzer:?}");

        let (exit_code, raw_output) = match &self.settings.formatter {
            Some(formatter) => self.run_piped(&mut analyzer, formatter)?,
            None => self.run_plain(&mut analyzer)?,
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| AnalyzeError::ReportWrite {
                path: destination.to_path_buf(),
                source,
            })?;
        }
        fs::write(destination, &raw_output).map_err(|source| AnalyzeError::ReportWrite {
            path: destination.to_path_buf(),
            source,
        })?;
        log::info!("report written to {}", destination.display());

        Ok(Invocation {
            report_path: destination.to_path_buf(),
            raw_output,
            exit_code,
        })
    }

    fn analyzer_command(&self, files: &ResolvedFileSet) -> Command {
        let spec = &self.settings.analyzer;
        let mut cmd = Command::new(&spec.program);
        cmd.arg(&self.settings.config_flag)
            .arg(&self.settings.config_path)
            .args(&spec.args)
            .args(files.paths());
        cmd
    }

    fn run_plain(&self, analyzer: &mut Command) -> Result<(i32, String), AnalyzeError> {
        let program = &self.settings.analyzer.program;
        let output = analyzer
            .stdin(Stdio::null())
            .output()
            .map_err(|source| spawn_error(program, source))?;
        let code = output.status.code().unwrap_or(-1);
        self.check_analyzer(code, &String::from_utf8_lossy(&output.stderr))?;
        Ok((code, String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    fn run_piped(
        &self,
        analyzer: &mut Command,
        formatter: &ProgramSpec,
    ) -> Result<(i32, String), AnalyzeError> {
        let program = &self.settings.analyzer.program;
        let mut analyzer = analyzer
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| spawn_error(program, source))?;

        let stderr_reader = drain_stderr(&mut analyzer);
        let Some(pipe) = analyzer.stdout.take() else {
            return Err(AnalyzeError::Io(io::Error::other("analyzer stdout not captured")));
        };

        let formatted = Command::new(&formatter.program)
            .args(&formatter.args)
            .stdin(Stdio::from(pipe))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .and_then(Child::wait_with_output);

        let status = analyzer.wait()?;
        let analyzer_stderr = stderr_reader.join().unwrap_or_default();
        let formatted = formatted.map_err(|source| spawn_error(&formatter.program, source))?;

        let code = status.code().unwrap_or(-1);
        self.check_analyzer(code, &analyzer_stderr)?;

        if !formatted.status.success() {
            return Err(AnalyzeError::Execution {
                program: formatter.program.clone(),
                code: formatted.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&formatted.stderr).trim().to_string(),
            });
        }
        Ok((code, String::from_utf8_lossy(&formatted.stdout).into_owned()))
    }

    fn check_analyzer(&self, code: i32, stderr: &str) -> Result<(), AnalyzeError> {
        if self.settings.is_success(code) {
            if code != 0 {
                log::debug!("{} exited with accepted status {code}", self.settings.analyzer.program);
            }
            return Ok(());
        }
        log::error!("{} failed with status {code}: {}", self.settings.analyzer.program, stderr.trim());
        Err(AnalyzeError::Execution {
            program: self.settings.analyzer.program.clone(),
            code,
            stderr: stderr.trim().to_string(),
        })
    }
}

fn spawn_error(program: &str, source: io::Error) -> AnalyzeError {
    AnalyzeError::Spawn {
        program: program.to_string(),
        source,
    }
}

fn drain_stderr(child: &mut Child) -> thread::JoinHandle<String> {
    let stderr = child.stderr.take();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr
            && let Err(e) = stderr.read_to_end(&mut buf)
        {
            log::debug!("stderr read stopped early: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Extract the score from report text; 0.0 when no marker is present
#[must_use]
pub fn extract_score(text: &str) -> f64 {
    [&*SCORE_SPAN, &*RATED_AT]
        .into_iter()
        .flatten()
        .find_map(|re| re.captures(text)?.get(1)?.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Read a report back from disk and extract its score
pub fn score_report(path: &Path) -> Result<f64, AnalyzeError> {
    let text = fs::read_to_string(path).map_err(|source| AnalyzeError::ReportUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(extract_score(&text))
}
