use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// How a target pattern is resolved against the workspace root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// A directory at a fixed path below the root, removed recursively
    Directory,
    /// Every directory at any depth whose name matches the glob
    DirGlob,
    /// Every file at any depth whose name matches the glob
    FileGlob,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Directory => "directory",
            TargetKind::DirGlob => "dir-glob",
            TargetKind::FileGlob => "file-glob",
        };
        f.write_str(name)
    }
}

/// A single thing the sweeper removes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupTarget {
    pub pattern: String,
    pub kind: TargetKind,
}

impl CleanupTarget {
    pub fn new(pattern: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }

    pub fn directory(pattern: impl Into<String>) -> Self {
        Self::new(pattern, TargetKind::Directory)
    }

    pub fn dir_glob(pattern: impl Into<String>) -> Self {
        Self::new(pattern, TargetKind::DirGlob)
    }

    pub fn file_glob(pattern: impl Into<String>) -> Self {
        Self::new(pattern, TargetKind::FileGlob)
    }

    /// Check that the pattern can never reach outside (or be) the root.
    pub fn validate(&self) -> Result<(), TargetError> {
        if self.pattern.trim().is_empty() {
            return Err(TargetError::Empty { kind: self.kind });
        }

        match self.kind {
            TargetKind::Directory => self.relative_dir().map(|_| ()),
            TargetKind::DirGlob | TargetKind::FileGlob => {
                if self.pattern.contains(['/', '\\']) {
                    return Err(TargetError::SeparatorInGlob {
                        pattern: self.pattern.clone(),
                    });
                }
                Glob::new(&self.pattern)
                    .map(|_| ())
                    .map_err(|source| TargetError::InvalidGlob {
                        pattern: self.pattern.clone(),
                        source,
                    })
            }
        }
    }

    /// Normalized relative path of a `Directory` target
    fn relative_dir(&self) -> Result<PathBuf, TargetError> {
        let mut relative = PathBuf::new();
        for component in Path::new(&self.pattern).components() {
            match component {
                Component::Normal(part) => relative.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(TargetError::EscapesRoot {
                        pattern: self.pattern.clone(),
                    });
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(TargetError::Absolute {
                        pattern: self.pattern.clone(),
                    });
                }
            }
        }

        if relative.as_os_str().is_empty() {
            return Err(TargetError::Empty { kind: self.kind });
        }
        Ok(relative)
    }
}

impl fmt::Display for CleanupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.pattern, self.kind)
    }
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("empty {kind} pattern")]
    Empty { kind: TargetKind },
    #[error("directory pattern {pattern:?} must be relative to the project root")]
    Absolute { pattern: String },
    #[error("directory pattern {pattern:?} must not climb out of the project root")]
    EscapesRoot { pattern: String },
    #[error("glob {pattern:?} is matched against entry names and cannot contain a path separator")]
    SeparatorInGlob { pattern: String },
    #[error("invalid glob {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Virtual environments, build output and tool caches at the project root
const DEFAULT_DIRECTORIES: &[&str] = &[
    ".venv",
    "venv",
    "env",
    "build",
    "dist",
    ".pytest_cache",
    ".ruff_cache",
    ".mypy_cache",
    ".tox",
];

const DEFAULT_DIR_GLOBS: &[&str] = &["__pycache__", "*.egg-info"];

const DEFAULT_FILE_GLOBS: &[&str] = &["*.pyc", "*.pyo"];

/// The built-in target list used when no configuration replaces it
pub fn default_targets() -> Vec<CleanupTarget> {
    DEFAULT_DIRECTORIES
        .iter()
        .map(|p| CleanupTarget::directory(*p))
        .chain(DEFAULT_DIR_GLOBS.iter().map(|p| CleanupTarget::dir_glob(*p)))
        .chain(DEFAULT_FILE_GLOBS.iter().map(|p| CleanupTarget::file_glob(*p)))
        .collect()
}

/// Validated, ready-to-match form of a target list
#[derive(Debug, Clone)]
pub struct TargetSet {
    directories: Vec<PathBuf>,
    dir_globs: GlobSet,
    file_globs: GlobSet,
}

impl TargetSet {
    pub fn compile(targets: &[CleanupTarget]) -> Result<Self, TargetError> {
        let mut directories = Vec::new();
        let mut dir_globs = GlobSetBuilder::new();
        let mut file_globs = GlobSetBuilder::new();

        for target in targets {
            target.validate()?;
            match target.kind {
                TargetKind::Directory => {
                    let dir = target.relative_dir()?;
                    if !directories.contains(&dir) {
                        directories.push(dir);
                    }
                }
                TargetKind::DirGlob => {
                    dir_globs.add(compile_glob(&target.pattern)?);
                }
                TargetKind::FileGlob => {
                    file_globs.add(compile_glob(&target.pattern)?);
                }
            }
        }

        Ok(Self {
            directories,
            dir_globs: build_set(dir_globs)?,
            file_globs: build_set(file_globs)?,
        })
    }

    /// Relative paths of the fixed directory targets, in configuration order
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    pub fn matches_dir_glob(&self, name: &OsStr) -> bool {
        self.dir_globs.is_match(Path::new(name))
    }

    pub fn matches_file_glob(&self, name: &OsStr) -> bool {
        self.file_globs.is_match(Path::new(name))
    }

    /// Whether `path` is one of the fixed directory targets of `root`
    pub fn is_directory_target(&self, root: &Path, path: &Path) -> bool {
        path.strip_prefix(root)
            .map(|rel| self.directories.iter().any(|dir| dir == rel))
            .unwrap_or(false)
    }

    pub fn has_dir_globs(&self) -> bool {
        !self.dir_globs.is_empty()
    }

    pub fn has_file_globs(&self) -> bool {
        !self.file_globs.is_empty()
    }
}

fn compile_glob(pattern: &str) -> Result<Glob, TargetError> {
    Glob::new(pattern).map_err(|source| TargetError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })
}

fn build_set(builder: GlobSetBuilder) -> Result<GlobSet, TargetError> {
    builder.build().map_err(|source| TargetError::InvalidGlob {
        pattern: source.glob().unwrap_or_default().to_string(),
        source,
    })
}
