use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::CleanerConfig;

/// Subdirectory that holds the Python project inside the repository
pub const DEFAULT_SUBDIR: &str = "python";

/// File that marks `<repo>/<subdir>` as the Python project
pub const PROJECT_MARKER: &str = "pyproject.toml";

#[derive(Debug, Error)]
pub enum RootError {
    #[error("could not find a project root containing {subdir}/pyproject.toml (searched upward from {searched:?})")]
    NotFound {
        subdir: String,
        searched: Vec<PathBuf>,
    },
}

/// Works out which directory a sweep should target.
///
/// Precedence: an explicit path, then the configured root, then discovery
/// upward from the executable's directory and finally from the working
/// directory.
#[derive(Debug, Clone, Default)]
pub struct RootResolver {
    exe_dir: Option<PathBuf>,
    current_dir: Option<PathBuf>,
}

impl RootResolver {
    pub fn new(exe_dir: Option<PathBuf>, current_dir: Option<PathBuf>) -> Self {
        Self {
            exe_dir,
            current_dir,
        }
    }

    /// Resolver seeded from the running process
    pub fn from_env() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        let current_dir = std::env::current_dir().ok();
        debug!("Executable dir: {:?}, working dir: {:?}", exe_dir, current_dir);
        Self::new(exe_dir, current_dir)
    }

    pub fn resolve(
        &self,
        explicit: Option<&Path>,
        config: &CleanerConfig,
    ) -> Result<PathBuf, RootError> {
        if let Some(path) = explicit {
            debug!("Using explicit root {:?}", path);
            return Ok(path.to_path_buf());
        }

        if let Some(root) = config.resolved_root() {
            debug!("Using configured root {:?}", root);
            return Ok(root);
        }

        let subdir = config.subdir();
        let starts: Vec<PathBuf> = [&self.exe_dir, &self.current_dir]
            .into_iter()
            .flatten()
            .cloned()
            .collect();

        for start in &starts {
            if let Some(root) = find_project_root(start, subdir) {
                info!("Found project root {:?} (from {:?})", root, start);
                return Ok(root);
            }
        }

        Err(RootError::NotFound {
            subdir: subdir.to_string(),
            searched: starts,
        })
    }
}

/// Walk from `start` up through its ancestors and return `<dir>/<subdir>` for
/// the first `dir` where `<dir>/<subdir>/pyproject.toml` exists
pub fn find_project_root(start: &Path, subdir: &str) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let candidate = dir.join(subdir);
        let found = candidate.join(PROJECT_MARKER).is_file();
        debug!("Checking {:?}: {}", candidate, found);
        found.then_some(candidate)
    })
}
