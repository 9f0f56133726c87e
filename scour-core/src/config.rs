use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::root::DEFAULT_SUBDIR;
use crate::target::{CleanupTarget, TargetError, default_targets};

/// Name of the per-project configuration file
pub const CONFIG_FILE_NAME: &str = "scour.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0:?} does not exist")]
    NotFound(PathBuf),
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid target {target}")]
    Target {
        target: CleanupTarget,
        #[source]
        source: TargetError,
    },
}

/// Cleaner settings, usually read from `scour.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanerConfig {
    /// Fixed project root; relative paths are resolved against the config file's directory
    pub root: Option<PathBuf>,
    /// Subdirectory that holds the Python project, used when discovering the root
    pub subdir: Option<String>,
    /// Replaces the built-in target list when set
    pub targets: Option<Vec<CleanupTarget>>,
    /// Appended to the active target list
    pub extra_targets: Vec<CleanupTarget>,

    #[serde(skip)]
    source: Option<PathBuf>,
}

impl CleanerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    /// Load an explicitly named config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, path)?;
        config.source = Some(path.to_path_buf());

        info!("Loaded config file: {:?}", path);
        Ok(config)
    }

    /// Look for `scour.toml` in `dir`, then in the user config directory.
    /// Falls back to the built-in defaults when neither exists.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self, ConfigError> {
        let local = dir.as_ref().join(CONFIG_FILE_NAME);
        if local.is_file() {
            return Self::load(local);
        }

        if let Some(user) = Self::user_config_path() {
            if user.is_file() {
                return Self::load(user);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// `<config dir>/scour/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scour").join("config.toml"))
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let configured = self.targets.iter().flatten();
        for target in configured.chain(&self.extra_targets) {
            target.validate().map_err(|source| ConfigError::Target {
                target: target.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// File this config was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn subdir(&self) -> &str {
        self.subdir.as_deref().unwrap_or(DEFAULT_SUBDIR)
    }

    /// The configured root, anchored at the config file's directory when relative
    pub fn resolved_root(&self) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        if root.is_absolute() {
            return Some(root.clone());
        }

        let base = self
            .source
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        Some(base.join(root))
    }

    /// Targets to sweep: the configured list (or the defaults) plus any extras
    pub fn active_targets(&self) -> Vec<CleanupTarget> {
        let mut targets = self.targets.clone().unwrap_or_else(default_targets);
        for extra in &self.extra_targets {
            if !targets.contains(extra) {
                targets.push(extra.clone());
            }
        }
        targets
    }
}
