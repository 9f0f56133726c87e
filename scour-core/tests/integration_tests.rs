use anyhow::Result;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use scour_core::{
    CleanerConfig, CleanupTarget, FsRemover, Remover, RootResolver, SweepConfig, Sweeper,
    TargetSet, default_targets,
};

/// Create a file (and its parents) below `root`
fn touch(root: &Path, relative: &str) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, "x".repeat(128))?;
    Ok(())
}

/// Every path below `root`, relative to it
fn snapshot(root: &Path) -> BTreeSet<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

/// A Python project with sources and every kind of default target
fn create_dirty_project(root: &Path) -> Result<()> {
    // sources and metadata that must survive
    touch(root, "pyproject.toml")?;
    touch(root, "uv.lock")?;
    touch(root, "app/__init__.py")?;
    touch(root, "app/server/main.py")?;
    touch(root, "app/agents/news.py")?;
    touch(root, "tests/test_main.py")?;
    touch(root, "docs/build.md")?;

    // virtual environment with its own caches
    touch(root, ".venv/pyvenv.cfg")?;
    touch(root, ".venv/lib/python3.12/site-packages/pkg/__pycache__/x.cpython-312.pyc")?;

    // build output and packaging metadata
    touch(root, "build/lib/app/__init__.py")?;
    touch(root, "dist/app-0.1.0-py3-none-any.whl")?;
    touch(root, "app.egg-info/PKG-INFO")?;
    touch(root, "app/vendor/dep.egg-info/PKG-INFO")?;

    // bytecode caches at several depths
    touch(root, "app/__pycache__/__init__.cpython-312.pyc")?;
    touch(root, "app/server/__pycache__/main.cpython-312.pyc")?;
    touch(root, "tests/__pycache__/test_main.cpython-312-pytest-8.0.pyc")?;
    touch(root, "app/agents/news.pyc")?;
    touch(root, "app/agents/news.pyo")?;

    // tool caches
    touch(root, ".pytest_cache/v/cache/lastfailed")?;
    touch(root, ".ruff_cache/0.5.0/123")?;
    touch(root, ".mypy_cache/3.12/app.meta.json")?;
    touch(root, ".tox/py312/log")?;

    Ok(())
}

fn expected_survivors() -> BTreeSet<PathBuf> {
    [
        "pyproject.toml",
        "uv.lock",
        "app",
        "app/__init__.py",
        "app/server",
        "app/server/main.py",
        "app/agents",
        "app/agents/news.py",
        "app/vendor",
        "tests",
        "tests/test_main.py",
        "docs",
        "docs/build.md",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

/// Refuses to delete one specific path, delegates everything else
struct RefusingRemover {
    refused: PathBuf,
}

impl RefusingRemover {
    fn check(&self, path: &Path) -> io::Result<()> {
        if path == self.refused {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        Ok(())
    }
}

impl Remover for RefusingRemover {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check(path)?;
        FsRemover.remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check(path)?;
        FsRemover.remove_file(path)
    }
}

#[test]
fn test_example_scenario() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("env"))?;
    touch(root, "pkg/__pycache__/mod.pyc")?;
    fs::create_dir_all(root.join("build"))?;
    fs::create_dir_all(root.join("dist"))?;
    fs::create_dir_all(root.join("pkg.egg-info"))?;
    fs::create_dir_all(root.join(".pytest_cache"))?;

    let sweeper = Sweeper::new(SweepConfig::default())?;
    let report = sweeper.clean(root);

    assert_eq!(snapshot(root), BTreeSet::from([PathBuf::from("pkg")]));
    assert_eq!(report.removed_dirs, 6);
    assert_eq!(report.removed_files, 0);
    assert!(report.failures.is_empty());

    let second = sweeper.clean(root);
    assert!(second.is_noop());
    assert_eq!(snapshot(root), BTreeSet::from([PathBuf::from("pkg")]));

    Ok(())
}

#[test]
fn test_completeness_and_non_destructiveness() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    create_dirty_project(root)?;

    let report = Sweeper::new(SweepConfig::default())?.clean(root);

    assert_eq!(snapshot(root), expected_survivors());
    assert!(report.failures.is_empty());
    assert!(report.bytes_freed > 0);

    // nothing left matches any default pattern
    let targets = TargetSet::compile(&default_targets())?;
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        assert!(!targets.is_directory_target(root, entry.path()));
        assert!(!targets.matches_dir_glob(entry.file_name()));
        assert!(!targets.matches_file_glob(entry.file_name()));
    }

    Ok(())
}

#[test]
fn test_idempotence() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    create_dirty_project(root)?;

    let sweeper = Sweeper::new(SweepConfig::default())?;
    let first = sweeper.clean(root);
    let after_first = snapshot(root);

    let second = sweeper.clean(root);
    let after_second = snapshot(root);

    assert!(first.total_removed() > 0);
    assert!(second.is_noop());
    assert_eq!(after_first, after_second);

    Ok(())
}

#[test]
fn test_absence_tolerance() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    touch(root, "pyproject.toml")?;
    touch(root, "app/main.py")?;
    let before = snapshot(root);

    let report = Sweeper::new(SweepConfig::default())?.clean(root);

    assert!(report.is_noop());
    assert_eq!(snapshot(root), before);

    // a root that does not exist at all is also fine
    let report = Sweeper::new(SweepConfig::default())?.clean(root.join("missing"));
    assert!(report.is_noop());

    Ok(())
}

#[test]
fn test_partial_failure_tolerance() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    create_dirty_project(root)?;

    let refused = root.join("app/server/__pycache__");
    let sweeper = Sweeper::with_remover(
        SweepConfig::default(),
        RefusingRemover {
            refused: refused.clone(),
        },
    )?;
    let report = sweeper.clean(root);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, refused);
    assert!(report.failures[0].error.contains("permission denied"));

    // the refused directory survives, its compiled files were still swept
    assert!(refused.is_dir());
    assert!(!refused.join("main.cpython-312.pyc").exists());

    // everything else is gone
    let mut expected = expected_survivors();
    expected.insert(PathBuf::from("app/server/__pycache__"));
    assert_eq!(snapshot(root), expected);

    Ok(())
}

#[test]
fn test_failed_directory_target_does_not_stop_sweep() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    create_dirty_project(root)?;

    let remover = RefusingRemover {
        refused: root.join(".venv"),
    };
    let sweeper = Sweeper::with_remover(SweepConfig::default(), &remover)?;
    let report = sweeper.clean(root);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, remover.refused);
    assert!(root.join(".venv/pyvenv.cfg").exists());
    assert!(!root.join("dist").exists());
    assert!(!root.join(".tox").exists());
    assert!(!root.join("app/__pycache__").exists());
    // caches inside the surviving environment are still best-effort cleaned
    assert!(
        !root
            .join(".venv/lib/python3.12/site-packages/pkg/__pycache__")
            .exists()
    );

    Ok(())
}

#[test]
fn test_dry_run_matches_real_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    create_dirty_project(root)?;
    let before = snapshot(root);

    let dry = Sweeper::new(SweepConfig {
        dry_run: true,
        ..Default::default()
    })?
    .clean(root);
    assert_eq!(snapshot(root), before);

    let real = Sweeper::new(SweepConfig::default())?.clean(root);

    assert_eq!(dry.removed_dirs, real.removed_dirs);
    assert_eq!(dry.removed_files, real.removed_files);
    assert_eq!(dry.bytes_freed, real.bytes_freed);

    Ok(())
}

#[test]
fn test_nested_directory_targets_count_once() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    touch(root, "build/lib/app.py")?;
    touch(root, "build/setup.log")?;

    let targets = vec![
        CleanupTarget::directory("build"),
        CleanupTarget::directory("build/lib"),
    ];

    let dry = Sweeper::new(SweepConfig {
        targets: targets.clone(),
        dry_run: true,
    })?
    .clean(root);
    assert!(root.join("build/lib/app.py").exists());

    let real = Sweeper::new(SweepConfig {
        targets,
        dry_run: false,
    })?
    .clean(root);

    assert_eq!(real.removed_dirs, 1);
    assert_eq!(real.bytes_freed, 256);
    assert!(real.failures.is_empty());
    assert!(!root.join("build").exists());

    assert_eq!(dry.removed_dirs, real.removed_dirs);
    assert_eq!(dry.bytes_freed, real.bytes_freed);

    Ok(())
}

#[test]
fn test_config_driven_sweep_from_discovered_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let repo = temp_dir.path();
    let project = repo.join("python");
    create_dirty_project(&project)?;
    touch(&project, ".nox/session/log")?;
    fs::write(
        repo.join("scour.toml"),
        r#"
[[extra_targets]]
pattern = ".nox"
kind = "directory"
"#,
    )?;

    let config = CleanerConfig::discover(repo)?;
    let resolver = RootResolver::new(Some(repo.join("frontend/src-tauri/target/release")), None);
    let root = resolver.resolve(None, &config)?;
    assert_eq!(root, project);

    let sweeper = Sweeper::new(SweepConfig {
        targets: config.active_targets(),
        dry_run: false,
    })?;
    sweeper.clean(&root);

    assert!(!project.join(".nox").exists());
    assert_eq!(snapshot(&project), expected_survivors());

    Ok(())
}

#[test]
fn test_custom_targets_leave_defaults_alone() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    create_dirty_project(root)?;

    let sweeper = Sweeper::new(SweepConfig {
        targets: vec![CleanupTarget::file_glob("*.pyo")],
        dry_run: false,
    })?;
    let report = sweeper.clean(root);

    assert_eq!(report.removed_files, 1);
    assert_eq!(report.removed_dirs, 0);
    assert!(!root.join("app/agents/news.pyo").exists());
    assert!(root.join("app/agents/news.pyc").exists());
    assert!(root.join(".venv").exists());

    Ok(())
}
