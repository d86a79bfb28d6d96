//! Logging setup alongside an embedding application's own subscriber
//!
//! Kept in its own test binary: the global subscriber is process-wide.

mod common;

use common::{base_options, FakeCompiler, FakeEmitter};
use polyemit_build::{init_tracing, EmitSession, ModuleKind, OutputVariant};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_run_and_init_with_existing_global_subscriber() {
    tracing::subscriber::set_global_default(tracing_subscriber::registry())
        .expect("no subscriber installed yet in this binary");
    std::env::set_var("RUST_LOG", "polyemit_build=debug");

    // must not try to replace the application's subscriber
    init_tracing();

    let temp = TempDir::new().unwrap();
    let emitter = Arc::new(FakeEmitter::new(&["index.ts"]));
    let mut compiler = FakeCompiler::new(emitter.clone());
    let session = EmitSession::new(
        base_options(),
        vec![
            OutputVariant::new(
                ModuleKind::CommonJs,
                temp.path().join("cjs"),
                temp.path().join("cache/cjs"),
            )
            .primary(),
            OutputVariant::new(
                ModuleKind::EsNext,
                temp.path().join("esm"),
                temp.path().join("cache/esm"),
            ),
        ],
    );

    let report = session.run(&mut compiler).unwrap();

    assert_eq!(emitter.call_count(), 2);
    assert!(temp.path().join("esm/index.js").exists());
    assert!(report.is_complete());
}
