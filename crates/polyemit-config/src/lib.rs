//! Polyemit Configuration System
//!
//! Provides configuration management for polyemit projects:
//! - Project configuration (polyemit.toml)
//! - The compiler section that seeds the base compiler options
//! - The emit section listing the module conventions to produce
//! - Environment variable overrides
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Project config (./polyemit.toml, found by walking up from the start directory)
//! 2. Environment variables (POLYEMIT_*)
//! 3. CLI flags (handled by the caller)
//!
//! # Example
//!
//! ```no_run
//! use polyemit_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! for variant in config.project.variants() {
//!     println!("{} -> {}", variant.module, variant.out_dir.display());
//! }
//! ```

pub mod loader;
pub mod module_kind;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown module kind '{0}'")]
    UnknownModuleKind(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// File name of the project configuration
pub const CONFIG_FILE_NAME: &str = "polyemit.toml";

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use module_kind::ModuleKind;
pub use project::{CompilerSection, EmitSection, ProjectConfig, VariantEntry};
