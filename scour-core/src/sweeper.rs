use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::SweepReport;
use crate::remover::{FsRemover, Remover};
use crate::target::{CleanupTarget, TargetError, TargetSet, default_targets};

/// Sweep phase, one per target kind plus start and end markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Starting,
    Directories,
    DirectoryGlobs,
    FileGlobs,
    Complete,
}

impl SweepPhase {
    pub fn description(&self) -> &'static str {
        match self {
            SweepPhase::Starting => "Starting cleanup",
            SweepPhase::Directories => "Removing environment, build and cache directories",
            SweepPhase::DirectoryGlobs => "Removing bytecode caches and packaging metadata",
            SweepPhase::FileGlobs => "Removing compiled bytecode files",
            SweepPhase::Complete => "Cleanup complete",
        }
    }
}

/// Progress event handed to the sweep callback
#[derive(Debug, Clone)]
pub struct SweepProgress {
    pub phase: SweepPhase,
    /// Path just removed; `None` marks the start of a phase
    pub current_path: Option<PathBuf>,
    pub processed: usize,
    pub total: Option<usize>,
}

/// Sweeper configuration
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub targets: Vec<CleanupTarget>,
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            dry_run: false,
        }
    }
}

/// Removes every configured target below a root, one phase at a time.
///
/// A sweep never fails as a whole: a target that cannot be removed is
/// logged, recorded in [`SweepReport::failures`], and skipped.
pub struct Sweeper<R = FsRemover> {
    targets: TargetSet,
    dry_run: bool,
    remover: R,
}

impl Sweeper<FsRemover> {
    pub fn new(config: SweepConfig) -> Result<Self, TargetError> {
        Self::with_remover(config, FsRemover)
    }
}

impl<R: Remover> Sweeper<R> {
    pub fn with_remover(config: SweepConfig, remover: R) -> Result<Self, TargetError> {
        let targets = TargetSet::compile(&config.targets)?;
        Ok(Self {
            targets,
            dry_run: config.dry_run,
            remover,
        })
    }

    /// Sweep `root`
    pub fn clean<P: AsRef<Path>>(&self, root: P) -> SweepReport {
        self.clean_with_progress(root, |_| {})
    }

    /// Sweep `root`, reporting each phase and removal to `progress_callback`
    pub fn clean_with_progress<P, F>(&self, root: P, progress_callback: F) -> SweepReport
    where
        P: AsRef<Path>,
        F: Fn(SweepProgress),
    {
        let root = root.as_ref();
        let start_time = Instant::now();
        let mut report = SweepReport::new(self.dry_run);

        progress_callback(SweepProgress {
            phase: SweepPhase::Starting,
            current_path: Some(root.to_path_buf()),
            processed: 0,
            total: None,
        });

        if root.is_dir() {
            info!("Sweeping {:?} (dry run: {})", root, self.dry_run);

            let directories = self.find_directories(root);
            self.remove_all(
                SweepPhase::Directories,
                directories,
                &mut report,
                &progress_callback,
            );

            if self.targets.has_dir_globs() {
                let dirs = self.find_glob_dirs(root, &mut report);
                self.remove_all(
                    SweepPhase::DirectoryGlobs,
                    dirs,
                    &mut report,
                    &progress_callback,
                );
            }

            if self.targets.has_file_globs() {
                let files = self.find_glob_files(root, &mut report);
                self.remove_all(
                    SweepPhase::FileGlobs,
                    files,
                    &mut report,
                    &progress_callback,
                );
            }
        } else {
            info!("{:?} is not a directory, nothing to clean", root);
        }

        report.duration_ms = start_time.elapsed().as_millis() as u64;

        progress_callback(SweepProgress {
            phase: SweepPhase::Complete,
            current_path: None,
            processed: report.total_removed(),
            total: Some(report.total_removed()),
        });

        info!(
            "Sweep finished: {} directories, {} files, {} freed, {} failures, {}ms",
            report.removed_dirs,
            report.removed_files,
            report.format_size(),
            report.failures.len(),
            report.duration_ms
        );

        report
    }

    fn remove_all<F>(
        &self,
        phase: SweepPhase,
        paths: Vec<PathBuf>,
        report: &mut SweepReport,
        progress_callback: &F,
    ) where
        F: Fn(SweepProgress),
    {
        let total = paths.len();
        debug!("{:?}: {} candidates", phase, total);

        progress_callback(SweepProgress {
            phase,
            current_path: None,
            processed: 0,
            total: Some(total),
        });

        for (index, path) in paths.into_iter().enumerate() {
            if self.remove_path(&path, report) {
                progress_callback(SweepProgress {
                    phase,
                    current_path: Some(path),
                    processed: index + 1,
                    total: Some(total),
                });
            }
        }
    }

    /// Remove one file, symlink or directory tree. Returns whether it went away.
    fn remove_path(&self, path: &Path, report: &mut SweepReport) -> bool {
        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{:?} is already gone", path);
                return false;
            }
            Err(e) => {
                self.record_failure(path, &e, report);
                return false;
            }
        };

        let is_dir = metadata.is_dir();
        let size = if is_dir {
            directory_size(path)
        } else {
            metadata.len()
        };

        if self.dry_run {
            debug!("DRY RUN: would remove {:?}", path);
            report.add_removed(is_dir, size);
            return true;
        }

        let result = if is_dir {
            self.remover.remove_dir_all(path)
        } else {
            self.remover.remove_file(path)
        };

        match result {
            Ok(()) => {
                debug!("Removed {:?}", path);
                report.add_removed(is_dir, size);
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{:?} disappeared before it could be removed", path);
                false
            }
            Err(e) => {
                self.record_failure(path, &e, report);
                false
            }
        }
    }

    /// Directory targets that currently exist below `root`.
    /// A target nested inside another directory target goes with its parent.
    fn find_directories(&self, root: &Path) -> Vec<PathBuf> {
        let directories = self.targets.directories();
        directories
            .iter()
            .filter(|rel| {
                let nested = directories
                    .iter()
                    .any(|outer| outer != *rel && rel.starts_with(outer));
                if nested {
                    debug!("{:?} lies inside another directory target", rel);
                }
                !nested
            })
            .filter(|rel| !crosses_symlink(root, rel))
            .map(|rel| root.join(rel))
            .filter(|path| match fs::symlink_metadata(path) {
                Ok(metadata) if metadata.is_dir() || metadata.file_type().is_symlink() => true,
                Ok(_) => {
                    debug!("{:?} is not a directory, leaving it in place", path);
                    false
                }
                Err(e) => e.kind() != io::ErrorKind::NotFound,
            })
            .collect()
    }

    /// Directories at any depth whose name matches a directory glob.
    /// The walk does not descend into a match.
    fn find_glob_dirs(&self, root: &Path, report: &mut SweepReport) -> Vec<PathBuf> {
        let mut found = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let is_link = entry.path_is_symlink();
                if !entry.file_type().is_dir() && !is_link {
                    return true;
                }
                if self.skips_directory_target(root, entry) {
                    return false;
                }
                if self.targets.matches_dir_glob(entry.file_name()) {
                    found.push(entry.path().to_path_buf());
                    return false;
                }
                true
            });

        for entry in walker {
            if let Err(err) = entry {
                self.record_walk_error(root, err, report);
            }
        }

        found
    }

    /// Non-directory entries at any depth whose name matches a file glob
    fn find_glob_files(&self, root: &Path, report: &mut SweepReport) -> Vec<PathBuf> {
        let mut found = Vec::new();

        let walker = WalkDir::new(root)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.file_type().is_dir() {
                    let already_swept = self.dry_run
                        && self.targets.matches_dir_glob(entry.file_name());
                    return !already_swept && !self.skips_directory_target(root, entry);
                }
                if self.targets.matches_file_glob(entry.file_name()) {
                    found.push(entry.path().to_path_buf());
                }
                true
            });

        for entry in walker {
            if let Err(err) = entry {
                self.record_walk_error(root, err, report);
            }
        }

        found
    }

    // Directory targets still exist during a dry run; their contents were already counted.
    fn skips_directory_target(&self, root: &Path, entry: &DirEntry) -> bool {
        self.dry_run && self.targets.is_directory_target(root, entry.path())
    }

    fn record_failure(&self, path: &Path, error: &io::Error, report: &mut SweepReport) {
        warn!("Failed to remove {:?}: {}", path, error);
        report.add_failure(path.to_path_buf(), error.to_string());
    }

    fn record_walk_error(&self, root: &Path, error: walkdir::Error, report: &mut SweepReport) {
        let path = error.path().unwrap_or(root).to_path_buf();
        warn!("Failed to scan {:?}: {}", path, error);
        report.add_failure(path, error.to_string());
    }
}

/// Whether any parent of the directory target `rel` is a symlink,
/// which would let the removal reach outside the root
fn crosses_symlink(root: &Path, rel: &Path) -> bool {
    let mut current = root.to_path_buf();
    let mut components = rel.components().peekable();

    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        if current.is_symlink() {
            warn!("Skipping {:?}: {:?} is a symlink", root.join(rel), current);
            return true;
        }
    }

    false
}

/// Total size of the files below `dir`
fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
