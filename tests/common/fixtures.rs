//! Test fixtures
//!
//! [`ProjectFixture`] lays out a small multi-app project:
//!
//! ```text
//! /
//! ├── .code-audit.toml
//! ├── pylintrc
//! ├── billing/
//! │   ├── __init__.py
//! │   ├── views.py
//! │   ├── models.py
//! │   ├── api/
//! │   │   ├── serializers.py
//! │   │   └── urls.py
//! │   └── migrations/
//! │       ├── 0001_initial.py
//! │       └── views.py
//! ├── auth/
//! │   ├── __init__.py
//! │   ├── views.py
//! │   └── forms.py
//! └── code_audit/
//!     └── views.py
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary multi-app project
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Create the standard layout with the default configuration
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        };

        for (path, content) in [
            ("billing/__init__.py", ""),
            ("billing/views.py", "def invoice():\n    pass\n"),
            ("billing/models.py", "class Invoice:\n    pass\n"),
            ("billing/api/serializers.py", "class InvoiceSerializer:\n    pass\n"),
            ("billing/api/urls.py", "urlpatterns = []\n"),
            ("billing/migrations/0001_initial.py", "operations = []\n"),
            ("billing/migrations/views.py", "# generated\n"),
            ("auth/__init__.py", ""),
            ("auth/views.py", "def login():\n    pass\n"),
            ("auth/forms.py", "class LoginForm:\n    pass\n"),
            ("code_audit/views.py", "def audit():\n    pass\n"),
            ("pylintrc", "[MASTER]\n"),
        ] {
            fixture.add_file(path, content);
        }
        fixture.configure("pylint", None);
        fixture
    }

    /// Project root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a project file
    pub fn file(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Directory reports are written to
    pub fn reports_dir(&self) -> PathBuf {
        self.dir.path().join("reports")
    }

    /// Add or replace a file
    pub fn add_file(&self, rel: &str, content: &str) {
        let path = self.file(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Rewrite `.code-audit.toml` to use `analyzer`, and `formatter` when given
    pub fn configure(&self, analyzer: &str, formatter: Option<&str>) {
        let formatter = match formatter {
            Some(program) => format!("enabled = true\nprogram = '{program}'\n"),
            None => "enabled = false\n".to_string(),
        };
        let config = format!(
            r#"[registry]
self_unit = "code_audit"

[[registry.units]]
name = "billing"
root = "billing"

[[registry.units]]
name = "auth"
root = "auth"

[[registry.units]]
name = "code_audit"
root = "code_audit"

[[registry.units]]
name = "rest_framework"

[analyzer]
program = '{analyzer}'
config_path = "pylintrc"

[formatter]
{formatter}
[reports]
dir = '{reports}'
"#,
            reports = self.reports_dir().display(),
        );
        self.add_file(".code-audit.toml", &config);
    }

    /// Install a fake analyzer exiting with `exit_code` and select it.
    ///
    /// The script lists the files it was given, then prints the content of
    /// the file set with [`Self::set_analyzer_output`].
    #[cfg(unix)]
    pub fn use_fake_analyzer(&self, exit_code: i32) -> PathBuf {
        let output = self.file("bin/analyzer-output.txt");
        if !output.exists() {
            self.set_analyzer_output("");
        }
        let body = format!(
            "shift 2\nfor f in \"$@\"; do echo \"checked: $f\"; done\ncat '{}'\n{}exit {exit_code}\n",
            output.display(),
            if exit_code == 0 { "" } else { "echo boom >&2\n" },
        );
        let script = fake_program(&self.file("bin"), &format!("analyzer-{exit_code}"), &body);
        self.configure(&script.display().to_string(), None);
        script
    }

    /// Text the fake analyzer appends to its output
    pub fn set_analyzer_output(&self, text: &str) {
        self.add_file("bin/analyzer-output.txt", text);
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Write an executable `/bin/sh` script
#[cfg(unix)]
pub fn fake_program(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
