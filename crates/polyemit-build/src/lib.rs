//! Polyemit multi-target emit
//!
//! Compiles a program once and writes it out in several module conventions:
//! - Variant registry: the validated list of output flavors and their options
//! - Emit multiplexer: wraps the compiler's emit entry point and fans each
//!   source emit out over the variants, keeping declarations and incremental
//!   build info single
//! - Emit session: resolves variants, installs the multiplexer around the
//!   compiler's emit sequence, and reports what was written
//!
//! # Debugging
//!
//! - `RUST_LOG=polyemit_build=debug`: one line per variant emit and per
//!   install/uninstall
//! - `RUST_LOG=polyemit_build=trace`: also every file written

pub mod changed;
pub mod emit;
pub mod error;
pub mod host;
pub mod multiplexer;
pub mod options;
pub mod session;
pub mod variants;

use std::sync::Once;

// Re-export main types
pub use changed::ChangedFiles;
pub use emit::{
    same_entry_point, Compiler, CompilerHandle, CustomTransformers, Diagnostic,
    DiagnosticCategory, EmitEntryPoint, EmitFlags, EmitHost, EmitResult, EmitSeam,
    SharedEmitEntryPoint, Transform, TransformerSet,
};
pub use error::{BuildError, BuildResult};
pub use host::FsEmitHost;
pub use multiplexer::{EmitMultiplexer, InstallGuard, MultiplexedEmit};
pub use options::{CompilerOptions, OptionsOverride, BUILD_INFO_FILE_NAME};
pub use session::{EmitReport, EmitSession, VariantSummary};
pub use variants::{OutputMode, OutputVariant, ResolvedVariant, VariantRegistry};

// Re-export configuration types for convenience
pub use polyemit_config::{Config, ConfigLoader, ModuleKind};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing output.
///
/// Meant for binaries and tests; library operations never call it. Safe to
/// call multiple times. Does nothing unless `RUST_LOG` is set, and leaves an
/// already installed global subscriber in place.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init()
                .ok();
        }
    });
}
