//! Configuration Loader
//!
//! Handles loading configuration from the project file and applying environment overrides.

use crate::project::{CompilerSection, ProjectConfig};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Forces the intermediate-cache build mode on or off
pub const ENV_CACHE: &str = "POLYEMIT_CACHE";

/// Overrides `compiler.out_dir`
pub const ENV_OUT_DIR: &str = "POLYEMIT_OUT_DIR";

/// Configuration loader
///
/// Loads configuration with the following precedence:
/// 1. Project config (./polyemit.toml) - lowest priority
/// 2. Environment variables (POLYEMIT_*) - overrides project
/// 3. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (used by callers that pin configuration)
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Project root directory (where polyemit.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not apply POLYEMIT_* environment overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find polyemit.toml.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(cache) = env::var(ENV_CACHE) {
            let cache_bool = matches!(cache.to_lowercase().as_str(), "true" | "1" | "yes");
            config.emit.get_or_insert_with(Default::default).cache = Some(cache_bool);
        }

        if let Ok(out_dir) = env::var(ENV_OUT_DIR) {
            if !out_dir.is_empty() {
                config
                    .compiler
                    .get_or_insert_with(CompilerSection::default)
                    .out_dir = Some(PathBuf::from(out_dir));
            }
        }

        Ok(config)
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has polyemit.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Resolve a configured path against the project root
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.project_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}
