use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod config;
pub mod remover;
pub mod root;
pub mod sweeper;
pub mod target;

pub use config::{CleanerConfig, ConfigError};
pub use remover::{FsRemover, Remover};
pub use root::{RootError, RootResolver};
pub use sweeper::{SweepConfig, SweepPhase, SweepProgress, Sweeper};
pub use target::{CleanupTarget, TargetError, TargetKind, TargetSet, default_targets};

/// A removal that failed and was skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub removed_dirs: usize,
    pub removed_files: usize,
    pub bytes_freed: u64,
    pub failures: Vec<SweepFailure>,
    pub dry_run: bool,
    pub duration_ms: u64,
}

impl SweepReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn add_removed(&mut self, is_dir: bool, size_freed: u64) {
        if is_dir {
            self.removed_dirs += 1;
        } else {
            self.removed_files += 1;
        }
        self.bytes_freed += size_freed;
    }

    pub fn add_failure(&mut self, path: PathBuf, error: String) {
        self.failures.push(SweepFailure { path, error });
    }

    pub fn total_removed(&self) -> usize {
        self.removed_dirs + self.removed_files
    }

    /// True when the sweep found nothing to remove and hit no errors
    pub fn is_noop(&self) -> bool {
        self.total_removed() == 0 && self.failures.is_empty()
    }

    pub fn format_size(&self) -> String {
        format_bytes(self.bytes_freed)
    }
}

/// Format a byte count for humans
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
