//! Compiler emit seam
//!
//! The compiler front end is external. What this crate sees of it is the
//! boundary declared here: an [`EmitEntryPoint`] that writes the outputs of
//! one translation unit (or the whole program), the [`EmitHost`] it writes
//! through, the [`TransformerSet`] it runs, and the [`EmitSeam`] slot on a
//! compiler instance that holds the current entry point.

use crate::error::BuildResult;
use crate::options::CompilerOptions;
use polyemit_config::ModuleKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique identity of a compiler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompilerHandle(u64);

impl CompilerHandle {
    /// Allocate a fresh handle
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric id
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CompilerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Severity of a compiler diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Suggestion,
    Message,
}

/// Diagnostic produced by the compiler during emit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// File the diagnostic refers to, if any
    pub file: Option<PathBuf>,
    /// Compiler diagnostic code
    pub code: u32,
    /// Severity
    pub category: DiagnosticCategory,
    /// Rendered message
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(code: u32, message: impl Into<String>) -> Self {
        Self {
            file: None,
            code,
            category: DiagnosticCategory::Error,
            message: message.into(),
        }
    }

    /// Create a warning diagnostic
    pub fn warning(code: u32, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attach the file this diagnostic refers to
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Outcome of one emit call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitResult {
    /// Diagnostics reported while emitting
    pub diagnostics: Vec<Diagnostic>,
    /// Some output could not be written
    pub emit_skipped: bool,
    /// Files written by this call
    pub emitted_files: Vec<PathBuf>,
}

impl EmitResult {
    /// Whether any diagnostic is an error
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.category == DiagnosticCategory::Error)
    }

    /// Fold another result into this one
    ///
    /// Used by compilers that emit unit by unit and report once per program.
    pub fn absorb(&mut self, other: EmitResult) {
        self.diagnostics.extend(other.diagnostics);
        self.emit_skipped |= other.emit_skipped;
        self.emitted_files.extend(other.emitted_files);
    }
}

/// Flags of a single emit call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EmitFlags {
    /// Write declaration artifacts only
    pub declarations_only: bool,
    /// Write the incremental build-info file only
    pub build_info_only: bool,
    /// Write declarations even if the options turn them off
    pub force_declarations: bool,
}

impl EmitFlags {
    /// Flags for a declarations-only call
    pub fn declarations_only() -> Self {
        Self {
            declarations_only: true,
            ..Self::default()
        }
    }

    /// Flags for a build-info-only call
    pub fn build_info_only() -> Self {
        Self {
            build_info_only: true,
            ..Self::default()
        }
    }

    /// Calls that produce convention-agnostic artifacts, which exist once per program
    pub fn is_pass_through(&self) -> bool {
        self.declarations_only || self.build_info_only
    }
}

/// A single pass in an emit pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transform {
    /// Erase type syntax
    StripTypes,
    /// Rewrite imports to `require` / `exports`
    CommonJsModule,
    /// Wrap in `define(...)`
    AmdModule,
    /// Wrap in a universal module factory
    UmdModule,
    /// Wrap in `System.register(...)`
    SystemModule,
    /// Keep static `import` / `export`
    EsModule,
    /// Pick the module format per file, Node style
    NodeModule,
    /// Produce declaration output
    Declarations,
    /// User-supplied pass, identified by name
    Custom(String),
}

impl Transform {
    /// Module transform for a convention
    pub fn for_module(module: ModuleKind) -> Self {
        match module {
            ModuleKind::CommonJs => Self::CommonJsModule,
            ModuleKind::Amd => Self::AmdModule,
            ModuleKind::Umd => Self::UmdModule,
            ModuleKind::System => Self::SystemModule,
            ModuleKind::Node16 | ModuleKind::NodeNext => Self::NodeModule,
            ModuleKind::Es2015
            | ModuleKind::Es2020
            | ModuleKind::Es2022
            | ModuleKind::EsNext
            | ModuleKind::Preserve => Self::EsModule,
        }
    }
}

/// User-supplied passes, inserted around the built-in ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTransformers {
    /// Run before the built-in script passes
    pub before: Vec<String>,
    /// Run after the built-in script passes
    pub after: Vec<String>,
    /// Run after the declaration pass
    pub after_declarations: Vec<String>,
}

/// Transformer pipelines for one emit call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformerSet {
    /// Convention the script pipeline targets
    pub module: ModuleKind,
    /// Script passes, empty for declarations-only emit
    pub script: Vec<Transform>,
    /// Declaration passes
    pub declaration: Vec<Transform>,
    custom: Option<CustomTransformers>,
}

impl TransformerSet {
    /// Derive the pipelines for the given options
    ///
    /// The script pipeline depends on the module convention, so a set derived
    /// for one convention must not be reused for another.
    pub fn derive(
        options: &CompilerOptions,
        custom: Option<&CustomTransformers>,
        declarations_only: bool,
    ) -> Self {
        let mut script = Vec::new();
        if !declarations_only {
            if let Some(custom) = custom {
                script.extend(custom.before.iter().cloned().map(Transform::Custom));
            }
            script.push(Transform::StripTypes);
            script.push(Transform::for_module(options.module));
            if let Some(custom) = custom {
                script.extend(custom.after.iter().cloned().map(Transform::Custom));
            }
        }

        let mut declaration = vec![Transform::Declarations];
        if let Some(custom) = custom {
            declaration.extend(
                custom
                    .after_declarations
                    .iter()
                    .cloned()
                    .map(Transform::Custom),
            );
        }

        Self {
            module: options.module,
            script,
            declaration,
            custom: custom.cloned(),
        }
    }

    /// The user-supplied passes this set was derived with
    pub fn custom(&self) -> Option<&CustomTransformers> {
        self.custom.as_ref()
    }
}

/// Compiler host as seen by an emit entry point
pub trait EmitHost {
    /// Effective compiler options for the current emit
    fn compiler_options(&self) -> &CompilerOptions;

    /// Write one output file
    fn write_file(&mut self, path: &Path, contents: &str) -> BuildResult<()>;
}

/// The compiler's "write outputs for this translation unit" operation
///
/// `R` is the compiler's emit resolver, opaque to this crate.
pub trait EmitEntryPoint<R: ?Sized>: Send + Sync {
    fn emit(
        &self,
        resolver: &R,
        host: &mut dyn EmitHost,
        target: Option<&Path>,
        transformers: &TransformerSet,
        flags: EmitFlags,
    ) -> BuildResult<EmitResult>;
}

/// Shared reference to an entry point, as stored in a compiler's seam
pub type SharedEmitEntryPoint<R> = Arc<dyn EmitEntryPoint<R>>;

/// Whether two shared entry points are the same object
pub fn same_entry_point<R: ?Sized>(a: &SharedEmitEntryPoint<R>, b: &SharedEmitEntryPoint<R>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// A compiler instance whose emit entry point can be swapped
pub trait EmitSeam {
    type Resolver: ?Sized + 'static;

    /// Identity of this compiler instance
    fn handle(&self) -> CompilerHandle;

    /// The entry point currently in use
    fn emit_entry_point(&self) -> SharedEmitEntryPoint<Self::Resolver>;

    /// Swap in a new entry point, returning the previous one
    fn replace_emit_entry_point(
        &mut self,
        entry: SharedEmitEntryPoint<Self::Resolver>,
    ) -> SharedEmitEntryPoint<Self::Resolver>;
}

/// A compiler that can run its normal emit sequence
///
/// The compiler calls its current entry point once per translation unit (or
/// once for the whole program) and finishes with a build-info-only call when
/// incremental state is on. It has no knowledge of multiplexing.
pub trait Compiler: EmitSeam {
    fn emit_program(
        &mut self,
        host: &mut dyn EmitHost,
        custom: Option<&CustomTransformers>,
    ) -> BuildResult<EmitResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = CompilerHandle::next();
        let b = CompilerHandle::next();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_pass_through_flags() {
        assert!(EmitFlags::declarations_only().is_pass_through());
        assert!(EmitFlags::build_info_only().is_pass_through());
        assert!(!EmitFlags::default().is_pass_through());
        let forced = EmitFlags {
            force_declarations: true,
            ..EmitFlags::default()
        };
        assert!(!forced.is_pass_through());
    }

    #[test]
    fn test_derive_depends_on_module() {
        let cjs = CompilerOptions::default().with_module(ModuleKind::CommonJs);
        let esm = CompilerOptions::default().with_module(ModuleKind::EsNext);

        let cjs_set = TransformerSet::derive(&cjs, None, false);
        let esm_set = TransformerSet::derive(&esm, None, false);

        assert_eq!(
            cjs_set.script,
            vec![Transform::StripTypes, Transform::CommonJsModule]
        );
        assert_eq!(esm_set.script, vec![Transform::StripTypes, Transform::EsModule]);
        assert_eq!(cjs_set.declaration, esm_set.declaration);
    }

    #[test]
    fn test_derive_declarations_only_has_no_script_passes() {
        let custom = CustomTransformers {
            before: vec!["inline-env".to_string()],
            after: vec![],
            after_declarations: vec!["strip-internal".to_string()],
        };
        let set = TransformerSet::derive(&CompilerOptions::default(), Some(&custom), true);
        assert!(set.script.is_empty());
        assert_eq!(
            set.declaration,
            vec![
                Transform::Declarations,
                Transform::Custom("strip-internal".to_string())
            ]
        );
        assert_eq!(set.custom(), Some(&custom));
    }

    #[test]
    fn test_custom_passes_wrap_builtins() {
        let custom = CustomTransformers {
            before: vec!["a".to_string()],
            after: vec!["z".to_string()],
            after_declarations: vec![],
        };
        let set = TransformerSet::derive(&CompilerOptions::default(), Some(&custom), false);
        assert_eq!(
            set.script,
            vec![
                Transform::Custom("a".to_string()),
                Transform::StripTypes,
                Transform::CommonJsModule,
                Transform::Custom("z".to_string()),
            ]
        );
    }

    #[test]
    fn test_absorb_ors_skip_flag() {
        let mut total = EmitResult::default();
        total.absorb(EmitResult {
            diagnostics: vec![Diagnostic::warning(6133, "unused")],
            emit_skipped: true,
            emitted_files: vec![PathBuf::from("a.js")],
        });
        total.absorb(EmitResult::default());
        assert!(total.emit_skipped);
        assert_eq!(total.emitted_files.len(), 1);
        assert!(!total.has_errors());
    }
}
