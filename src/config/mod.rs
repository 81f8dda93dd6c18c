//! Configuration management.
//!
//! Settings come from a TOML file found at (in order) an explicit path,
//! `ASPECT_WORKSPACE_CONFIG_PATH`, the platform config dir or
//! `~/.config/aspect-workspace/`. Anything not set falls back to defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "ASPECT_WORKSPACE_CONFIG_PATH";

/// Environment variable overriding the workspace root.
pub const WORKSPACE_ROOT_ENV: &str = "ASPECT_WORKSPACE_ROOT";

const APP_DIR: &str = "aspect-workspace";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_WORKSPACE_DIR: &str = "aspect-models";

/// Main configuration for a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Root directory holding `namespace/version/file` documents.
    pub workspace_root: PathBuf,
    /// Directory backups are written to; the workspace root when unset.
    pub backup_dir: Option<PathBuf>,
    /// Model store backend.
    pub store: StoreBackendType,
    /// Default for `migrate --bump-version`.
    pub bump_version: bool,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Model store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackendType {
    /// Documents under the workspace directory.
    #[default]
    Filesystem,
    /// Documents held in process memory.
    Memory,
}

impl StoreBackendType {
    /// Parses a backend name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "filesystem" | "fs" | "file" => Some(Self::Filesystem),
            "memory" | "in-memory" | "in_memory" => Some(Self::Memory),
            _ => None,
        }
    }

    /// Returns the backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
            Self::Memory => "memory",
        }
    }
}

/// Logging settings from the `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `debug` or `aspect_workspace=trace`.
    pub level: Option<String>,
    /// File to append logs to instead of stderr.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Workspace root.
    pub workspace_root: Option<String>,
    /// Backup destination.
    pub backup_dir: Option<String>,
    /// Store backend name.
    pub store: Option<String>,
    /// Migration version bump default.
    pub bump_version: Option<bool>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        let workspace_root = directories::BaseDirs::new().map_or_else(
            || PathBuf::from(DEFAULT_WORKSPACE_DIR),
            |dirs| dirs.home_dir().join(DEFAULT_WORKSPACE_DIR),
        );
        Self {
            workspace_root,
            backup_dir: None,
            store: StoreBackendType::default(),
            bump_version: false,
            logging: LoggingSettings::default(),
        }
    }
}

impl WorkspaceConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an
    /// unknown store backend.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. `ASPECT_WORKSPACE_CONFIG_PATH`
    /// 2. Platform-specific config dir (`~/Library/Application Support/aspect-workspace/` on macOS)
    /// 3. XDG config dir (`~/.config/aspect-workspace/`)
    ///
    /// Returns default configuration if no config file is found.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be loaded.
    pub fn load_default() -> crate::Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Self::load_from_file(Path::new(&path));
        }

        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let candidates = [
            base_dirs.config_dir().join(APP_DIR).join(CONFIG_FILE),
            base_dirs
                .home_dir()
                .join(".config")
                .join(APP_DIR)
                .join(CONFIG_FILE),
        ];
        for candidate in &candidates {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "Loading config file");
                return Self::load_from_file(candidate);
            }
        }

        Ok(Self::default())
    }

    /// Loads an explicit config file, or the default one, then applies
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        let config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default()?,
        };
        Ok(config.with_env_overrides())
    }

    /// Applies `ASPECT_WORKSPACE_ROOT` when set.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        match std::env::var_os(WORKSPACE_ROOT_ENV) {
            Some(root) if !root.is_empty() => self.with_workspace_root(root),
            _ => self,
        }
    }

    /// Converts a `ConfigFile` to `WorkspaceConfig`.
    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(root) = file.workspace_root {
            config.workspace_root = expand_home(&root);
        }
        if let Some(backup_dir) = file.backup_dir {
            config.backup_dir = Some(expand_home(&backup_dir));
        }
        if let Some(store) = file.store {
            config.store = StoreBackendType::parse(&store).ok_or_else(|| {
                crate::Error::InvalidInput(format!("unknown store backend: {store}"))
            })?;
        }
        if let Some(bump) = file.bump_version {
            config.bump_version = bump;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        Ok(config)
    }

    /// Sets the workspace root.
    #[must_use]
    pub fn with_workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = path.into();
        self
    }

    /// Sets the backup destination.
    #[must_use]
    pub fn with_backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(path.into());
        self
    }

    /// Sets the store backend.
    #[must_use]
    pub const fn with_store(mut self, store: StoreBackendType) -> Self {
        self.store = store;
        self
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(dirs) = directories::BaseDirs::new()
    {
        return dirs.home_dir().join(rest);
    }
    PathBuf::from(path)
}
