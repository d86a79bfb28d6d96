/// Output variants and the validated variant registry
use crate::error::{BuildError, BuildResult};
use crate::options::{CompilerOptions, OptionsOverride};
use polyemit_config::ModuleKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where variant artifacts land for this build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Final output directories
    #[default]
    Final,
    /// Intermediate cache directories
    Cache,
}

impl OutputMode {
    /// Mode for a "cache enabled" switch
    pub fn from_cache_flag(cache: bool) -> Self {
        if cache {
            Self::Cache
        } else {
            Self::Final
        }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Final => write!(f, "final"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// One requested output flavor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputVariant {
    /// Module convention
    pub module: ModuleKind,
    /// Final output directory
    pub out_dir: PathBuf,
    /// Output directory in cache mode
    pub cache_dir: PathBuf,
    /// Matches the project's declared configuration
    pub primary: bool,
}

impl OutputVariant {
    /// Create a non-primary variant
    pub fn new(
        module: ModuleKind,
        out_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            module,
            out_dir: out_dir.into(),
            cache_dir: cache_dir.into(),
            primary: false,
        }
    }

    /// Mark as the primary variant
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Output directory for the given mode
    pub fn effective_dir(&self, mode: OutputMode) -> &Path {
        match mode {
            OutputMode::Final => &self.out_dir,
            OutputMode::Cache => &self.cache_dir,
        }
    }

    /// Validate the variant on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.out_dir.as_os_str().is_empty() {
            return Err(format!("variant '{}' has an empty output path", self.module));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(format!("variant '{}' has an empty cache path", self.module));
        }
        Ok(())
    }
}

/// A validated variant paired with its derived compiler options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVariant {
    variant: OutputVariant,
    options: CompilerOptions,
}

impl ResolvedVariant {
    /// The variant as requested
    pub fn variant(&self) -> &OutputVariant {
        &self.variant
    }

    /// Compiler options this variant emits with
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Module convention
    pub fn module(&self) -> ModuleKind {
        self.variant.module
    }

    /// Whether this is the primary variant
    pub fn is_primary(&self) -> bool {
        self.variant.primary
    }

    /// Effective output directory
    pub fn output_dir(&self) -> Option<&Path> {
        self.options.out_dir.as_deref()
    }
}

/// Ordered, validated set of output variants
#[derive(Debug, Clone)]
pub struct VariantRegistry {
    variants: Vec<ResolvedVariant>,
    primary: usize,
    mode: OutputMode,
}

impl VariantRegistry {
    /// Validate `variants` and derive each variant's compiler options from `base`
    ///
    /// Fails with [`BuildError::Configuration`] unless exactly one variant is
    /// primary, every module convention appears once, every output path is
    /// set, and the primary's convention is the one `base` declares.
    pub fn resolve(
        base: &CompilerOptions,
        variants: Vec<OutputVariant>,
        mode: OutputMode,
    ) -> BuildResult<Self> {
        if variants.is_empty() {
            return Err(BuildError::configuration("no output variants configured"));
        }

        for variant in &variants {
            variant.validate().map_err(BuildError::Configuration)?;
        }

        let mut seen = HashSet::new();
        for variant in &variants {
            if !seen.insert(variant.module) {
                return Err(BuildError::configuration(format!(
                    "module '{}' is configured by more than one variant",
                    variant.module
                )));
            }
        }

        let primaries: Vec<usize> = variants
            .iter()
            .enumerate()
            .filter(|(_, v)| v.primary)
            .map(|(idx, _)| idx)
            .collect();
        let primary = match primaries.as_slice() {
            [idx] => *idx,
            [] => return Err(BuildError::configuration("no primary variant")),
            many => {
                return Err(BuildError::configuration(format!(
                    "{} variants are marked primary, expected exactly one",
                    many.len()
                )))
            }
        };

        if variants[primary].module != base.module {
            return Err(BuildError::configuration(format!(
                "primary variant emits '{}' but the compiler options declare '{}'",
                variants[primary].module, base.module
            )));
        }

        let variants = variants
            .into_iter()
            .map(|variant| {
                let out_dir = variant.effective_dir(mode).to_path_buf();
                let patch = if variant.primary {
                    OptionsOverride::for_primary(out_dir)
                } else {
                    OptionsOverride::for_secondary(variant.module, out_dir)
                };
                ResolvedVariant {
                    options: base.with_override(&patch),
                    variant,
                }
            })
            .collect();

        Ok(Self {
            variants,
            primary,
            mode,
        })
    }

    /// The primary variant
    pub fn primary(&self) -> &ResolvedVariant {
        &self.variants[self.primary]
    }

    /// Convention of the primary variant
    pub fn default_module(&self) -> ModuleKind {
        self.primary().module()
    }

    /// Variants in emit order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedVariant> {
        self.variants.iter()
    }

    /// Variant for a module convention
    pub fn get(&self, module: ModuleKind) -> Option<&ResolvedVariant> {
        self.variants.iter().find(|v| v.module() == module)
    }

    /// Module conventions in emit order
    pub fn modules(&self) -> Vec<ModuleKind> {
        self.variants.iter().map(|v| v.module()).collect()
    }

    /// Number of variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Always false for a resolved registry
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Output mode the paths were resolved for
    pub fn mode(&self) -> OutputMode {
        self.mode
    }
}
