//! Tests for the target resolver
//!
//! The resolver turns a target specification into concrete files using an
//! ordered fallback chain: direct path, unit-relative path, file name
//! search and directory name search.

use std::collections::HashSet;
use std::path::PathBuf;

use code_audit::resolver::{Origin, ResolveError};
use code_audit::target::TargetSpec;

use crate::common::{ProjectFixture, fixture_resolver};

fn as_set(paths: &[PathBuf]) -> HashSet<PathBuf> {
    paths.iter().cloned().collect()
}

// =============================================================================
// Direct and unit-relative paths
// =============================================================================

#[test]
fn existing_absolute_path_is_returned_unchanged() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);
    let path = project.file("billing/models.py");

    let set = resolver.resolve(&TargetSpec::new(path.to_string_lossy())).unwrap();
    assert_eq!(set.origin(), Origin::Direct);
    assert_eq!(set.paths(), &[path]);
}

#[test]
fn existing_directory_is_returned_unchanged() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);
    let dir = project.file("billing/api");

    let set = resolver.resolve(&TargetSpec::new(dir.to_string_lossy())).unwrap();
    assert_eq!(set.origin(), Origin::Direct);
    assert_eq!(set.paths(), &[dir]);
}

#[test]
fn unit_relative_path_is_rebuilt_under_unit_root() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let set = resolver.resolve(&TargetSpec::new("billing/api/urls.py")).unwrap();
    assert_eq!(set.origin(), Origin::AppRelative);
    assert_eq!(set.paths(), &[project.file("billing/api/urls.py")]);
}

#[test]
fn unit_relative_path_skips_leading_segments() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let set = resolver.resolve(&TargetSpec::new("somewhere/else/auth/forms.py")).unwrap();
    assert_eq!(set.origin(), Origin::AppRelative);
    assert_eq!(set.paths(), &[project.file("auth/forms.py")]);
}

// =============================================================================
// Name and directory search
// =============================================================================

#[test]
fn bare_filename_matches_once_per_unit() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let set = resolver.resolve(&TargetSpec::new("views.py")).unwrap();
    assert_eq!(set.origin(), Origin::NameSearch);
    assert_eq!(
        as_set(set.paths()),
        as_set(&[project.file("billing/views.py"), project.file("auth/views.py")])
    );
}

#[test]
fn name_search_ignores_self_unit_and_migrations() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let set = resolver.resolve(&TargetSpec::new("views.py")).unwrap();
    assert!(!set.contains(&project.file("code_audit/views.py")));
    assert!(!set.contains(&project.file("billing/migrations/views.py")));
}

#[test]
fn name_search_skips_hidden_directories() {
    let project = ProjectFixture::new();
    project.add_file("auth/.cache/tasks.py", "");
    let resolver = fixture_resolver(&project);

    let result = resolver.resolve(&TargetSpec::new("tasks.py"));
    assert!(matches!(result, Err(ResolveError::NotFound { .. })));
}

#[test]
fn partial_path_matches_trailing_components() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let set = resolver.resolve(&TargetSpec::new("api/serializers.py")).unwrap();
    assert_eq!(set.origin(), Origin::NameSearch);
    assert_eq!(set.paths(), &[project.file("billing/api/serializers.py")]);
}

#[test]
fn bare_directory_name_matches_directories() {
    let project = ProjectFixture::new();
    project.add_file("auth/api/tokens.py", "");
    let resolver = fixture_resolver(&project);

    let set = resolver.resolve(&TargetSpec::new("api")).unwrap();
    assert_eq!(set.origin(), Origin::DirectorySearch);
    assert_eq!(
        as_set(set.paths()),
        as_set(&[project.file("billing/api"), project.file("auth/api")])
    );
}

#[test]
fn unit_root_is_not_a_directory_match() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    // "auth" is rebuilt to the unit root in step 2, never found by step 4
    let set = resolver.resolve(&TargetSpec::new("auth")).unwrap();
    assert_eq!(set.origin(), Origin::AppRelative);
    assert_eq!(set.paths(), &[project.file("auth")]);
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn unknown_name_is_not_found() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let result = resolver.resolve(&TargetSpec::new("nonexistent_mod"));
    match result {
        Err(ResolveError::NotFound { target }) => assert_eq!(target, "nonexistent_mod"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn unknown_file_is_not_found() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let result = resolver.resolve(&TargetSpec::new("payments.py"));
    assert!(matches!(result, Err(ResolveError::NotFound { .. })));
}

#[test]
fn migrations_path_is_rejected_even_when_it_exists() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);
    let path = project.file("billing/migrations/0001_initial.py");
    assert!(path.exists());

    let result = resolver.resolve(&TargetSpec::new(path.to_string_lossy()));
    assert!(matches!(result, Err(ResolveError::NotFound { .. })));

    let result = resolver.resolve(&TargetSpec::new("billing/migrations"));
    assert!(matches!(result, Err(ResolveError::NotFound { .. })));
}

#[test]
fn empty_spec_is_rejected() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);
    assert!(matches!(resolver.resolve(&TargetSpec::new("  ")), Err(ResolveError::Empty)));
}

// =============================================================================
// Project scan and helpers
// =============================================================================

#[test]
fn scan_sources_lists_auditable_files() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let set = resolver.scan_sources();
    assert_eq!(set.origin(), Origin::ProjectScan);
    assert_eq!(
        as_set(set.paths()),
        as_set(&[
            project.file("billing/views.py"),
            project.file("billing/models.py"),
            project.file("billing/api/serializers.py"),
            project.file("billing/api/urls.py"),
            project.file("auth/views.py"),
            project.file("auth/forms.py"),
        ])
    );
}

#[test]
fn app_relative_rejects_migrations_and_unknown_units() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    assert_eq!(
        resolver.app_relative(std::path::Path::new("/checkout/billing/views.py")),
        Some(project.file("billing/views.py"))
    );
    assert_eq!(resolver.app_relative(std::path::Path::new("billing/migrations/views.py")), None);
    assert_eq!(resolver.app_relative(std::path::Path::new("shop/views.py")), None);
}

#[test]
fn locate_keeps_paths_already_inside_a_unit() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let inside = project.file("billing/api/urls.py");
    assert_eq!(resolver.locate(&inside), Some(inside.clone()));
    assert_eq!(resolver.locate(&project.file("billing/migrations/views.py")), None);

    // relative and foreign paths are rebuilt from their unit segment
    assert_eq!(
        resolver.locate(std::path::Path::new("auth/forms.py")),
        Some(project.file("auth/forms.py"))
    );
    assert_eq!(
        resolver.locate(std::path::Path::new("/checkout/auth/forms.py")),
        Some(project.file("auth/forms.py"))
    );
}

#[test]
fn sources_under_expands_directories() {
    let project = ProjectFixture::new();
    let resolver = fixture_resolver(&project);

    let files = resolver.sources_under(&project.file("billing"));
    assert_eq!(files.len(), 4);
    assert!(!files.contains(&project.file("billing/__init__.py")));
    assert!(!files.contains(&project.file("billing/migrations/0001_initial.py")));

    let single = resolver.sources_under(&project.file("auth/forms.py"));
    assert_eq!(single, vec![project.file("auth/forms.py")]);
}
