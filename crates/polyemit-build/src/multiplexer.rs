//! Emit multiplexer
//!
//! Installs a wrapper in a compiler's emit slot that runs the original entry
//! point once per output variant. Declaration-only and build-info-only calls
//! are forwarded once, unchanged: there is exactly one declaration set and
//! one build-info file per program, whatever the number of variants.
//!
//! The multiplexer has two states. [`EmitMultiplexer::install`] is the only
//! way into `Installed`, [`EmitMultiplexer::uninstall`] the only way out, and
//! both either complete or leave everything as it was.

use crate::changed::ChangedFiles;
use crate::emit::{
    CompilerHandle, EmitEntryPoint, EmitFlags, EmitHost, EmitResult, EmitSeam,
    SharedEmitEntryPoint, TransformerSet,
};
use crate::error::{BuildError, BuildResult};
use crate::options::CompilerOptions;
use crate::variants::VariantRegistry;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Entry point that fans each source emit out over all variants
pub struct MultiplexedEmit<R: ?Sized> {
    original: SharedEmitEntryPoint<R>,
    registry: Arc<VariantRegistry>,
    changed_files: Option<ChangedFiles>,
}

impl<R: ?Sized> MultiplexedEmit<R> {
    /// Wrap `original` for the variants in `registry`
    pub fn new(
        original: SharedEmitEntryPoint<R>,
        registry: Arc<VariantRegistry>,
        changed_files: Option<ChangedFiles>,
    ) -> Self {
        Self {
            original,
            registry,
            changed_files,
        }
    }

    /// The wrapped entry point
    pub fn original(&self) -> &SharedEmitEntryPoint<R> {
        &self.original
    }
}

impl<R: ?Sized + 'static> EmitEntryPoint<R> for MultiplexedEmit<R> {
    fn emit(
        &self,
        resolver: &R,
        host: &mut dyn EmitHost,
        target: Option<&Path>,
        transformers: &TransformerSet,
        flags: EmitFlags,
    ) -> BuildResult<EmitResult> {
        if flags.is_pass_through() {
            debug!(?flags, target = ?target, "forwarding emit once");
            return self.original.emit(resolver, host, target, transformers, flags);
        }

        if let (Some(unit), Some(changed)) = (target, &self.changed_files) {
            changed.record(unit);
        }

        let default_module = self.registry.default_module();
        let mut emit_skipped = false;
        let mut primary_result = None;

        for variant in self.registry.iter() {
            let options = variant.options();
            let variant_transformers =
                TransformerSet::derive(options, transformers.custom(), flags.declarations_only);
            let mut variant_host = VariantHost {
                inner: &mut *host,
                options,
            };

            debug!(
                module = %variant.module(),
                out_dir = ?options.out_dir,
                target = ?target,
                "emitting variant"
            );
            let result = self
                .original
                .emit(resolver, &mut variant_host, target, &variant_transformers, flags)
                .map_err(|e| BuildError::in_variant(variant.module(), e))?;

            if result.emit_skipped {
                warn!(module = %variant.module(), target = ?target, "variant emit skipped");
            }
            emit_skipped |= result.emit_skipped;

            // Diagnostics stem from the shared front end; the primary's are canonical.
            if variant.module() == default_module {
                primary_result = Some(result);
            }
        }

        let mut result = primary_result.ok_or_else(|| {
            BuildError::configuration(format!(
                "no variant emits the default module '{}'",
                default_module
            ))
        })?;
        result.emit_skipped = emit_skipped;
        Ok(result)
    }
}

/// Host view whose options are a variant's instead of the ambient ones
struct VariantHost<'a> {
    inner: &'a mut dyn EmitHost,
    options: &'a CompilerOptions,
}

impl EmitHost for VariantHost<'_> {
    fn compiler_options(&self) -> &CompilerOptions {
        self.options
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> BuildResult<()> {
        self.inner.write_file(path, contents)
    }
}

enum MultiplexerState<R: ?Sized> {
    Uninstalled,
    Installed {
        handle: CompilerHandle,
        original: SharedEmitEntryPoint<R>,
        registry: Arc<VariantRegistry>,
    },
}

/// Install/uninstall state for one build invocation
///
/// Owned by the orchestrator for the lifetime of one build; at most one
/// installation is active at a time.
pub struct EmitMultiplexer<R: ?Sized> {
    state: MultiplexerState<R>,
}

impl<R: ?Sized + 'static> EmitMultiplexer<R> {
    /// Create an uninstalled multiplexer
    pub fn new() -> Self {
        Self {
            state: MultiplexerState::Uninstalled,
        }
    }

    /// Whether a wrapper is currently installed
    pub fn is_installed(&self) -> bool {
        matches!(self.state, MultiplexerState::Installed { .. })
    }

    /// Handle of the compiler the wrapper is installed on
    pub fn active_handle(&self) -> Option<CompilerHandle> {
        match &self.state {
            MultiplexerState::Installed { handle, .. } => Some(*handle),
            MultiplexerState::Uninstalled => None,
        }
    }

    /// Registry of the active installation
    pub fn registry(&self) -> Option<&VariantRegistry> {
        match &self.state {
            MultiplexerState::Installed { registry, .. } => Some(registry),
            MultiplexerState::Uninstalled => None,
        }
    }

    /// Replace `compiler`'s emit entry point with a multiplexing wrapper
    pub fn install<C>(
        &mut self,
        compiler: &mut C,
        registry: VariantRegistry,
        changed_files: Option<ChangedFiles>,
    ) -> BuildResult<()>
    where
        C: EmitSeam<Resolver = R> + ?Sized,
    {
        if let Some(handle) = self.active_handle() {
            return Err(BuildError::PatchAlreadyInstalled { handle });
        }

        let handle = compiler.handle();
        let original = compiler.emit_entry_point();
        let registry = Arc::new(registry);
        let wrapper: SharedEmitEntryPoint<R> = Arc::new(MultiplexedEmit::new(
            Arc::clone(&original),
            Arc::clone(&registry),
            changed_files,
        ));
        compiler.replace_emit_entry_point(wrapper);

        debug!(
            compiler = %handle,
            variants = ?registry.modules(),
            mode = %registry.mode(),
            "installed emit multiplexer"
        );
        self.state = MultiplexerState::Installed {
            handle,
            original,
            registry,
        };
        Ok(())
    }

    /// Restore `compiler`'s original emit entry point and return it
    pub fn uninstall<C>(&mut self, compiler: &mut C) -> BuildResult<SharedEmitEntryPoint<R>>
    where
        C: EmitSeam<Resolver = R> + ?Sized,
    {
        let requested = compiler.handle();
        let original = match &self.state {
            MultiplexerState::Uninstalled => return Err(BuildError::NoActivePatch),
            MultiplexerState::Installed { handle, .. } if *handle != requested => {
                return Err(BuildError::PatchMismatch {
                    installed: *handle,
                    requested,
                })
            }
            MultiplexerState::Installed { original, .. } => Arc::clone(original),
        };

        compiler.replace_emit_entry_point(Arc::clone(&original));
        self.state = MultiplexerState::Uninstalled;
        debug!(compiler = %requested, "uninstalled emit multiplexer");
        Ok(original)
    }

    /// Install and return a guard that uninstalls when dropped
    pub fn scoped<'a, C>(
        &'a mut self,
        compiler: &'a mut C,
        registry: VariantRegistry,
        changed_files: Option<ChangedFiles>,
    ) -> BuildResult<InstallGuard<'a, C>>
    where
        C: EmitSeam<Resolver = R> + ?Sized,
    {
        self.install(compiler, registry, changed_files)?;
        Ok(InstallGuard {
            multiplexer: self,
            compiler,
        })
    }
}

impl<R: ?Sized + 'static> Default for EmitMultiplexer<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped installation; the original entry point is restored on every exit path
///
/// Dereferences to the compiler so the build can drive emission through it.
pub struct InstallGuard<'a, C: EmitSeam + ?Sized> {
    multiplexer: &'a mut EmitMultiplexer<C::Resolver>,
    compiler: &'a mut C,
}

impl<C: EmitSeam + ?Sized> InstallGuard<'_, C> {
    /// Uninstall now, surfacing any error instead of logging it
    pub fn finish(self) -> BuildResult<SharedEmitEntryPoint<C::Resolver>> {
        self.multiplexer.uninstall(&mut *self.compiler)
    }
}

impl<C: EmitSeam + ?Sized> Deref for InstallGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &*self.compiler
    }
}

impl<C: EmitSeam + ?Sized> DerefMut for InstallGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut *self.compiler
    }
}

impl<C: EmitSeam + ?Sized> Drop for InstallGuard<'_, C> {
    fn drop(&mut self) {
        if !self.multiplexer.is_installed() {
            return;
        }
        if let Err(e) = self.multiplexer.uninstall(&mut *self.compiler) {
            error!("failed to restore emit entry point: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::same_entry_point;
    use crate::variants::{OutputMode, OutputVariant};
    use polyemit_config::ModuleKind;

    struct Noop;

    impl EmitEntryPoint<()> for Noop {
        fn emit(
            &self,
            _resolver: &(),
            _host: &mut dyn EmitHost,
            _target: Option<&Path>,
            _transformers: &TransformerSet,
            _flags: EmitFlags,
        ) -> BuildResult<EmitResult> {
            Ok(EmitResult::default())
        }
    }

    struct Slot {
        handle: CompilerHandle,
        entry: SharedEmitEntryPoint<()>,
    }

    impl EmitSeam for Slot {
        type Resolver = ();

        fn handle(&self) -> CompilerHandle {
            self.handle
        }

        fn emit_entry_point(&self) -> SharedEmitEntryPoint<()> {
            Arc::clone(&self.entry)
        }

        fn replace_emit_entry_point(
            &mut self,
            entry: SharedEmitEntryPoint<()>,
        ) -> SharedEmitEntryPoint<()> {
            std::mem::replace(&mut self.entry, entry)
        }
    }

    fn registry() -> VariantRegistry {
        VariantRegistry::resolve(
            &CompilerOptions::default(),
            vec![OutputVariant::new(ModuleKind::CommonJs, "/cjs", "/c/cjs").primary()],
            OutputMode::Final,
        )
        .unwrap()
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let original: SharedEmitEntryPoint<()> = Arc::new(Noop);
        let mut slot = Slot {
            handle: CompilerHandle::next(),
            entry: Arc::clone(&original),
        };
        let mut multiplexer = EmitMultiplexer::new();

        {
            let guard = multiplexer.scoped(&mut slot, registry(), None).unwrap();
            assert!(!same_entry_point(&guard.emit_entry_point(), &original));
        }

        assert!(!multiplexer.is_installed());
        assert!(same_entry_point(&slot.entry, &original));
    }

    #[test]
    fn test_guard_finish_returns_original() {
        let original: SharedEmitEntryPoint<()> = Arc::new(Noop);
        let mut slot = Slot {
            handle: CompilerHandle::next(),
            entry: Arc::clone(&original),
        };
        let mut multiplexer = EmitMultiplexer::new();

        let guard = multiplexer.scoped(&mut slot, registry(), None).unwrap();
        let restored = guard.finish().unwrap();

        assert!(same_entry_point(&restored, &original));
        assert_eq!(multiplexer.active_handle(), None);
    }
}
