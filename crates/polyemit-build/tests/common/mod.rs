//! Shared test doubles: a scripted compiler and an in-memory host
#![allow(dead_code)]

use parking_lot::Mutex;
use polyemit_build::{
    BuildError, BuildResult, Compiler, CompilerHandle, CompilerOptions, CustomTransformers,
    Diagnostic, EmitEntryPoint, EmitFlags, EmitHost, EmitResult, EmitSeam, ModuleKind,
    OutputMode, OutputVariant, SharedEmitEntryPoint, TransformerSet, VariantRegistry,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Opaque resolver the fake compiler hands to its entry point
#[derive(Debug, Default)]
pub struct FakeResolver;

/// One recorded call into the fake entry point
#[derive(Debug, Clone)]
pub struct EmitCall {
    pub target: Option<PathBuf>,
    pub options: CompilerOptions,
    pub transformers: TransformerSet,
    pub flags: EmitFlags,
}

/// Entry point that writes one artifact per unit and records every call
#[derive(Default)]
pub struct FakeEmitter {
    units: Vec<PathBuf>,
    diagnostics: HashMap<ModuleKind, Vec<Diagnostic>>,
    skipped: HashSet<ModuleKind>,
    failing: Option<ModuleKind>,
    calls: Mutex<Vec<EmitCall>>,
}

impl FakeEmitter {
    pub fn new(units: &[&str]) -> Self {
        Self {
            units: units.iter().map(PathBuf::from).collect(),
            ..Self::default()
        }
    }

    /// Report these diagnostics when emitting `module`
    pub fn with_diagnostics(mut self, module: ModuleKind, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics.insert(module, diagnostics);
        self
    }

    /// Report `emit_skipped` when emitting `module`
    pub fn skipping(mut self, module: ModuleKind) -> Self {
        self.skipped.insert(module);
        self
    }

    /// Fail when emitting `module`
    pub fn failing_on(mut self, module: ModuleKind) -> Self {
        self.failing = Some(module);
        self
    }

    pub fn calls(&self) -> Vec<EmitCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl EmitEntryPoint<FakeResolver> for FakeEmitter {
    fn emit(
        &self,
        _resolver: &FakeResolver,
        host: &mut dyn EmitHost,
        target: Option<&Path>,
        transformers: &TransformerSet,
        flags: EmitFlags,
    ) -> BuildResult<EmitResult> {
        let options = host.compiler_options().clone();
        self.calls.lock().push(EmitCall {
            target: target.map(Path::to_path_buf),
            options: options.clone(),
            transformers: transformers.clone(),
            flags,
        });

        if self.failing == Some(options.module) {
            return Err(BuildError::Emit("disk full".to_string()));
        }

        let mut emitted_files = Vec::new();

        if flags.build_info_only {
            if let Some(path) = options.build_info_path() {
                host.write_file(&path, "{\"version\":1}")?;
                emitted_files.push(path);
            }
            return Ok(EmitResult {
                emitted_files,
                ..EmitResult::default()
            });
        }

        let units: Vec<PathBuf> = match target {
            Some(unit) => vec![unit.to_path_buf()],
            None => self.units.clone(),
        };

        for unit in &units {
            if !flags.declarations_only {
                let js = options.output_path_for(unit, "js");
                host.write_file(&js, &format!("// {} via {:?}\n", options.module, transformers.script))?;
                emitted_files.push(js);
            }
            if options.declaration || flags.force_declarations || flags.declarations_only {
                let dts = options.output_path_for(unit, "d.ts");
                host.write_file(&dts, "export {};\n")?;
                emitted_files.push(dts);
            }
            if options.declaration_map && !flags.declarations_only {
                let map = options.output_path_for(unit, "d.ts.map");
                host.write_file(&map, "{}")?;
                emitted_files.push(map);
            }
        }

        Ok(EmitResult {
            diagnostics: self
                .diagnostics
                .get(&options.module)
                .cloned()
                .unwrap_or_default(),
            emit_skipped: self.skipped.contains(&options.module),
            emitted_files,
        })
    }
}

/// Compiler that emits unit by unit, then writes build info once
pub struct FakeCompiler {
    handle: CompilerHandle,
    entry: SharedEmitEntryPoint<FakeResolver>,
    resolver: FakeResolver,
    units: Vec<PathBuf>,
}

impl FakeCompiler {
    pub fn new(emitter: Arc<FakeEmitter>) -> Self {
        let units = emitter.units.clone();
        Self {
            handle: CompilerHandle::next(),
            entry: emitter,
            resolver: FakeResolver,
            units,
        }
    }

    /// Call the current entry point directly, like the compiler would for one unit
    pub fn emit_unit(
        &self,
        host: &mut dyn EmitHost,
        target: Option<&Path>,
        flags: EmitFlags,
    ) -> BuildResult<EmitResult> {
        let transformers =
            TransformerSet::derive(host.compiler_options(), None, flags.declarations_only);
        self.entry
            .emit(&self.resolver, host, target, &transformers, flags)
    }
}

impl EmitSeam for FakeCompiler {
    type Resolver = FakeResolver;

    fn handle(&self) -> CompilerHandle {
        self.handle
    }

    fn emit_entry_point(&self) -> SharedEmitEntryPoint<FakeResolver> {
        Arc::clone(&self.entry)
    }

    fn replace_emit_entry_point(
        &mut self,
        entry: SharedEmitEntryPoint<FakeResolver>,
    ) -> SharedEmitEntryPoint<FakeResolver> {
        std::mem::replace(&mut self.entry, entry)
    }
}

impl Compiler for FakeCompiler {
    fn emit_program(
        &mut self,
        host: &mut dyn EmitHost,
        custom: Option<&CustomTransformers>,
    ) -> BuildResult<EmitResult> {
        let mut total = EmitResult::default();
        for unit in &self.units {
            let transformers = TransformerSet::derive(host.compiler_options(), custom, false);
            let result = self.entry.emit(
                &self.resolver,
                host,
                Some(unit),
                &transformers,
                EmitFlags::default(),
            )?;
            total.absorb(result);
        }
        if host.compiler_options().incremental {
            let transformers = TransformerSet::derive(host.compiler_options(), custom, false);
            let result = self.entry.emit(
                &self.resolver,
                host,
                None,
                &transformers,
                EmitFlags::build_info_only(),
            )?;
            total.absorb(result);
        }
        Ok(total)
    }
}

/// Host that keeps written files in memory
pub struct MemoryHost {
    options: CompilerOptions,
    pub files: BTreeMap<PathBuf, String>,
}

impl MemoryHost {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            files: BTreeMap::new(),
        }
    }

    /// Written paths under `dir`
    pub fn files_under(&self, dir: &str) -> Vec<PathBuf> {
        self.files
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect()
    }
}

impl EmitHost for MemoryHost {
    fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> BuildResult<()> {
        self.files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }
}

/// Base options used by most tests: CommonJS, declarations on
pub fn base_options() -> CompilerOptions {
    CompilerOptions::default()
        .with_module(ModuleKind::CommonJs)
        .with_declarations(true)
}

/// `[{commonjs, primary, /cjs}, {esnext, /esm}]`
pub fn dual_variants() -> Vec<OutputVariant> {
    vec![
        OutputVariant::new(ModuleKind::CommonJs, "/cjs", "/cache/cjs").primary(),
        OutputVariant::new(ModuleKind::EsNext, "/esm", "/cache/esm"),
    ]
}

pub fn dual_registry() -> VariantRegistry {
    VariantRegistry::resolve(&base_options(), dual_variants(), OutputMode::Final).unwrap()
}
