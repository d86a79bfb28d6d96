//! Emit session: one multiplexed compiler emit phase
use crate::changed::ChangedFiles;
use crate::emit::{Compiler, CustomTransformers, EmitResult};
use crate::error::{BuildError, BuildResult};
use crate::host::FsEmitHost;
use crate::multiplexer::EmitMultiplexer;
use crate::options::CompilerOptions;
use crate::variants::{OutputMode, OutputVariant, ResolvedVariant, VariantRegistry};

use polyemit_config::{Config, ModuleKind};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Summary of one variant for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantSummary {
    /// Module convention
    pub module: ModuleKind,
    /// Effective output directory
    pub out_dir: Option<PathBuf>,
    /// Whether this variant emitted declarations
    pub declarations: bool,
    /// Whether this is the primary variant
    pub primary: bool,
}

impl From<&ResolvedVariant> for VariantSummary {
    fn from(variant: &ResolvedVariant) -> Self {
        Self {
            module: variant.module(),
            out_dir: variant.output_dir().map(|p| p.to_path_buf()),
            declarations: variant.options().emits_declarations(),
            primary: variant.is_primary(),
        }
    }
}

/// Result of an emit session
#[derive(Debug, Clone, Serialize)]
pub struct EmitReport {
    /// Aggregated emit result (primary diagnostics, OR of skip flags)
    pub result: EmitResult,
    /// Translation units for which emission was attempted, sorted
    pub changed_files: Vec<PathBuf>,
    /// Every file written, across all variants, in write order
    pub written_files: Vec<PathBuf>,
    /// Variants in emit order
    pub variants: Vec<VariantSummary>,
    /// Output mode of this build
    pub mode: OutputMode,
    /// Wall time of the emit phase
    pub elapsed: Duration,
}

impl EmitReport {
    /// Whether every variant was written completely
    pub fn is_complete(&self) -> bool {
        !self.result.emit_skipped
    }

    /// Render the report as pretty-printed JSON
    pub fn to_json(&self) -> BuildResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Orchestrates one compiler emit phase across all configured variants
#[derive(Debug, Clone)]
pub struct EmitSession {
    /// Base compiler options, as the project declares them
    options: CompilerOptions,
    /// Requested variants, in emit order
    variants: Vec<OutputVariant>,
    /// Final or cache output
    mode: OutputMode,
    /// User-supplied transformer passes
    custom: Option<CustomTransformers>,
    /// Externally owned changed-files sink
    changed_files: Option<ChangedFiles>,
}

impl EmitSession {
    /// Create a session for the given base options and variants
    pub fn new(options: CompilerOptions, variants: Vec<OutputVariant>) -> Self {
        Self {
            options,
            variants,
            mode: OutputMode::Final,
            custom: None,
            changed_files: None,
        }
    }

    /// Create a session from loaded project configuration
    ///
    /// Relative paths are resolved against the project root. Without an
    /// `[emit]` section the project builds a single primary variant in
    /// `compiler.out_dir`.
    pub fn from_config(config: &Config) -> BuildResult<Self> {
        let project = &config.project;

        let mut options = project
            .compiler
            .as_ref()
            .map(CompilerOptions::from_config)
            .unwrap_or_default();
        options.out_dir = options.out_dir.map(|p| config.resolve_path(&p));
        options.root_dir = options.root_dir.map(|p| config.resolve_path(&p));
        options.build_info_file = options.build_info_file.map(|p| config.resolve_path(&p));

        let variants = if project.variants().is_empty() {
            let out_dir = options.out_dir.clone().ok_or_else(|| {
                BuildError::configuration("no [[emit.variants]] and no compiler.out_dir configured")
            })?;
            let cache_dir = config.resolve_path(
                &PathBuf::from(polyemit_config::project::DEFAULT_CACHE_DIR)
                    .join(options.module.name()),
            );
            vec![OutputVariant::new(options.module, out_dir, cache_dir).primary()]
        } else {
            project
                .variants()
                .iter()
                .map(|entry| OutputVariant {
                    module: entry.module,
                    out_dir: config.resolve_path(&entry.out_dir),
                    cache_dir: config.resolve_path(&project.variant_cache_dir(entry)),
                    primary: entry.primary,
                })
                .collect()
        };

        Ok(Self::new(options, variants)
            .with_output_mode(OutputMode::from_cache_flag(project.cache_enabled())))
    }

    /// Set the output mode
    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set user-supplied transformer passes
    pub fn with_custom_transformers(mut self, custom: CustomTransformers) -> Self {
        self.custom = Some(custom);
        self
    }

    /// Record emitted translation units into an externally owned sink
    pub fn with_changed_files(mut self, changed_files: ChangedFiles) -> Self {
        self.changed_files = Some(changed_files);
        self
    }

    /// Base compiler options
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Validate the variants and derive their options
    pub fn resolve(&self) -> BuildResult<VariantRegistry> {
        VariantRegistry::resolve(&self.options, self.variants.clone(), self.mode)
    }

    /// Run the compiler's emit sequence with the multiplexer installed
    ///
    /// Configuration errors are reported before anything is written. The
    /// compiler's original entry point is restored whether or not emission
    /// succeeds.
    pub fn run<C>(&self, compiler: &mut C) -> BuildResult<EmitReport>
    where
        C: Compiler + ?Sized,
    {
        let start = Instant::now();

        let registry = self.resolve()?;
        let changed_files = self.changed_files.clone().unwrap_or_default();
        let variants: Vec<VariantSummary> = registry.iter().map(VariantSummary::from).collect();

        info!(
            variants = registry.len(),
            primary = %registry.default_module(),
            mode = %self.mode,
            "starting multi-target emit"
        );

        // Declarations and build info are written once, through the ambient
        // options, so they land under the primary's output directory.
        let mut host = FsEmitHost::new(registry.primary().options().clone());

        let mut multiplexer = EmitMultiplexer::new();
        let mut guard =
            multiplexer.scoped(compiler, registry, Some(changed_files.clone()))?;
        let result = guard.emit_program(&mut host, self.custom.as_ref())?;
        guard.finish()?;

        let elapsed = start.elapsed();
        if result.emit_skipped {
            warn!("emit skipped for at least one variant");
        }
        debug!(
            written = host.written_files().len(),
            diagnostics = result.diagnostics.len(),
            "emit phase finished"
        );
        info!(
            changed = changed_files.len(),
            "emit completed in {:.2}s",
            elapsed.as_secs_f64()
        );

        Ok(EmitReport {
            result,
            changed_files: changed_files.snapshot(),
            written_files: host.into_written_files(),
            variants,
            mode: self.mode,
            elapsed,
        })
    }
}
