//! Compiler options and per-variant overrides
//!
//! A variant's options are always the base options with an [`OptionsOverride`]
//! applied on top. The override is a plain record of optional fields: every
//! `Some` replaces the base value, every `None` keeps it.

use polyemit_config::{CompilerSection, ModuleKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Effective compiler configuration seen by an emit entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Output directory for emitted artifacts
    pub out_dir: Option<PathBuf>,
    /// Module convention of emitted code
    pub module: ModuleKind,
    /// Language level of emitted code
    pub target: Option<String>,
    /// Root of the source tree mirrored under `out_dir`
    pub root_dir: Option<PathBuf>,
    /// Emit declaration files
    pub declaration: bool,
    /// Emit declaration maps
    pub declaration_map: bool,
    /// Emit source maps
    pub source_map: bool,
    /// Persist incremental build state
    pub incremental: bool,
    /// Explicit build-info file location
    pub build_info_file: Option<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            out_dir: None,
            module: ModuleKind::CommonJs,
            target: None,
            root_dir: None,
            declaration: false,
            declaration_map: false,
            source_map: false,
            incremental: false,
            build_info_file: None,
        }
    }
}

impl CompilerOptions {
    /// Build options from the `[compiler]` section of polyemit.toml
    pub fn from_config(section: &CompilerSection) -> Self {
        let mut options = Self::default();
        options.merge_with_config(section);
        options
    }

    /// Merge a `[compiler]` section on top of these options
    pub fn merge_with_config(&mut self, section: &CompilerSection) {
        if let Some(module) = section.module {
            self.module = module;
        }
        if let Some(target) = &section.target {
            self.target = Some(target.clone());
        }
        if let Some(out_dir) = &section.out_dir {
            self.out_dir = Some(out_dir.clone());
        }
        if let Some(root_dir) = &section.root_dir {
            self.root_dir = Some(root_dir.clone());
        }
        if let Some(declaration) = section.declaration {
            self.declaration = declaration;
        }
        if let Some(declaration_map) = section.declaration_map {
            self.declaration_map = declaration_map;
        }
        if let Some(source_map) = section.source_map {
            self.source_map = source_map;
        }
        if let Some(incremental) = section.incremental {
            self.incremental = incremental;
        }
        if let Some(build_info_file) = &section.build_info_file {
            self.build_info_file = Some(build_info_file.clone());
        }
    }

    /// Set the module convention
    pub fn with_module(mut self, module: ModuleKind) -> Self {
        self.module = module;
        self
    }

    /// Set the output directory
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }

    /// Enable or disable declaration and declaration-map emission together
    pub fn with_declarations(mut self, enabled: bool) -> Self {
        self.declaration = enabled;
        self.declaration_map = enabled;
        self
    }

    /// Enable or disable incremental build state
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Return a copy with `patch` applied field by field
    pub fn with_override(&self, patch: &OptionsOverride) -> Self {
        let mut options = self.clone();
        if let Some(out_dir) = &patch.out_dir {
            options.out_dir = Some(out_dir.clone());
        }
        if let Some(module) = patch.module {
            options.module = module;
        }
        if let Some(declaration) = patch.declaration {
            options.declaration = declaration;
        }
        if let Some(declaration_map) = patch.declaration_map {
            options.declaration_map = declaration_map;
        }
        options
    }

    /// Whether any declaration artifact is produced with these options
    pub fn emits_declarations(&self) -> bool {
        self.declaration || self.declaration_map
    }

    /// Location of the incremental build-info file, if incremental state is on
    ///
    /// An explicit `build_info_file` wins; otherwise the file lives in `out_dir`.
    pub fn build_info_path(&self) -> Option<PathBuf> {
        if !self.incremental {
            return None;
        }
        if let Some(path) = &self.build_info_file {
            return Some(path.clone());
        }
        self.out_dir
            .as_deref()
            .map(|dir| dir.join(BUILD_INFO_FILE_NAME))
    }

    /// Output path of an artifact for `unit` with the given extension
    ///
    /// `unit` is made relative to `root_dir` when it lies under it, so each
    /// output directory mirrors the source tree.
    pub fn output_path_for(&self, unit: &Path, extension: &str) -> PathBuf {
        let relative = match &self.root_dir {
            Some(root) => unit.strip_prefix(root).unwrap_or(unit),
            None => unit,
        };
        let stem = strip_source_extension(relative);
        let file = format!("{}.{}", stem.display(), extension);
        match &self.out_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        }
    }
}

/// Default name of the incremental build-info file
pub const BUILD_INFO_FILE_NAME: &str = "polyemit.buildinfo";

fn strip_source_extension(path: &Path) -> PathBuf {
    let name = path.to_string_lossy();
    for ext in [".d.ts", ".tsx", ".ts", ".mts", ".cts", ".jsx", ".js"] {
        if let Some(stripped) = name.strip_suffix(ext) {
            return PathBuf::from(stripped);
        }
    }
    path.to_path_buf()
}

/// Field-by-field patch applied on top of base options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionsOverride {
    /// Replacement output directory
    pub out_dir: Option<PathBuf>,
    /// Replacement module convention
    pub module: Option<ModuleKind>,
    /// Replacement declaration toggle
    pub declaration: Option<bool>,
    /// Replacement declaration-map toggle
    pub declaration_map: Option<bool>,
}

impl OptionsOverride {
    /// Override for the primary variant: only the output directory moves
    pub fn for_primary(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: Some(out_dir.into()),
            ..Default::default()
        }
    }

    /// Override for a non-primary variant
    ///
    /// Moves the output directory, switches the module convention, and turns
    /// declaration output off. Declarations come from the primary only.
    pub fn for_secondary(module: ModuleKind, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: Some(out_dir.into()),
            module: Some(module),
            declaration: Some(false),
            declaration_map: Some(false),
        }
    }
}
