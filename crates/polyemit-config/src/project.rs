//! Project Configuration (polyemit.toml)
//!
//! Handles project-level configuration stored in `polyemit.toml` at the project root.

use crate::module_kind::ModuleKind;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default root for intermediate-cache output
pub const DEFAULT_CACHE_DIR: &str = ".polyemit/cache";

/// Project configuration from polyemit.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Compiler configuration, the base every variant derives from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerSection>,

    /// Emit configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emit: Option<EmitSection>,
}

/// Compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CompilerSection {
    /// Declared (default) module convention
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleKind>,

    /// Language level of emitted code (e.g. "es2019")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Output directory used when no variants are configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    /// Root of the source tree mirrored under each output directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    /// Emit declaration files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,

    /// Emit declaration maps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_map: Option<bool>,

    /// Emit source maps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<bool>,

    /// Persist incremental build state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,

    /// Explicit incremental build-info file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info_file: Option<PathBuf>,
}

/// Emit configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EmitSection {
    /// Write into the intermediate cache instead of the final output paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,

    /// Root of per-variant cache directories (default: ".polyemit/cache")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Requested output variants, in emit order
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantEntry>,
}

/// One requested output variant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VariantEntry {
    /// Module convention of this variant
    pub module: ModuleKind,

    /// Final output directory
    pub out_dir: PathBuf,

    /// Cache output directory (default: "<emit.cache_dir>/<module>")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Marks the variant matching the declared configuration
    #[serde(default)]
    pub primary: bool,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    ///
    /// Only checks what can be judged from the file alone. The primary-count
    /// rule is enforced when the build resolves its variant registry.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(compiler) = &self.compiler {
            if let Some(out_dir) = &compiler.out_dir {
                validate_path("compiler.out_dir", out_dir)?;
            }
        }

        let Some(emit) = &self.emit else {
            return Ok(());
        };

        if emit.variants.is_empty() {
            return Err(ConfigError::ValidationError(
                "[emit] must list at least one variant".to_string(),
            ));
        }

        if let Some(cache_dir) = &emit.cache_dir {
            validate_path("emit.cache_dir", cache_dir)?;
        }

        let mut seen = HashSet::new();
        for (idx, variant) in emit.variants.iter().enumerate() {
            validate_path(&format!("emit.variants[{}].out_dir", idx), &variant.out_dir)?;
            if let Some(cache_dir) = &variant.cache_dir {
                validate_path(&format!("emit.variants[{}].cache_dir", idx), cache_dir)?;
            }
            if !seen.insert(variant.module) {
                return Err(ConfigError::InvalidValue {
                    field: format!("emit.variants[{}].module", idx),
                    reason: format!("module '{}' is listed more than once", variant.module),
                });
            }
        }

        Ok(())
    }

    /// Whether the intermediate-cache build mode is requested
    pub fn cache_enabled(&self) -> bool {
        self.emit.as_ref().and_then(|e| e.cache).unwrap_or(false)
    }

    /// Requested variants, in emit order
    pub fn variants(&self) -> &[VariantEntry] {
        self.emit
            .as_ref()
            .map(|e| e.variants.as_slice())
            .unwrap_or(&[])
    }

    /// Effective cache directory for a variant
    pub fn variant_cache_dir(&self, variant: &VariantEntry) -> PathBuf {
        if let Some(dir) = &variant.cache_dir {
            return dir.clone();
        }
        let root = self
            .emit
            .as_ref()
            .and_then(|e| e.cache_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
        root.join(variant.module.name())
    }

}

fn validate_path(field: &str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: "path cannot be empty".to_string(),
        });
    }
    Ok(())
}
