/// Emit pipeline error types
use crate::emit::CompilerHandle;
use polyemit_config::{ConfigError, ModuleKind};
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid variant configuration: {0}")]
    Configuration(String),

    #[error("Emit multiplexer already installed on compiler {handle}")]
    PatchAlreadyInstalled { handle: CompilerHandle },

    #[error("No emit multiplexer is installed")]
    NoActivePatch,

    #[error("Emit multiplexer is installed on compiler {installed}, not {requested}")]
    PatchMismatch {
        installed: CompilerHandle,
        requested: CompilerHandle,
    },

    #[error("Emit failed for module '{module}': {source}")]
    VariantEmit {
        module: ModuleKind,
        #[source]
        source: Box<BuildError>,
    },

    #[error("Emit failed: {0}")]
    Emit(String),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to serialize emit report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BuildError {
    /// Create a variant configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Attach the module convention that was being emitted
    pub fn in_variant(module: ModuleKind, error: BuildError) -> Self {
        Self::VariantEmit {
            module,
            source: Box::new(error),
        }
    }

    /// Module convention active when the failure happened, if known
    pub fn variant(&self) -> Option<ModuleKind> {
        match self {
            Self::VariantEmit { module, .. } => Some(*module),
            _ => None,
        }
    }
}
