/// Module-loading conventions an output variant can target
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Module convention emitted code uses to reference other modules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// Synchronous `require` / `module.exports`
    CommonJs,
    /// Asynchronous module definition
    Amd,
    /// Universal module definition
    Umd,
    /// SystemJS register format
    System,
    /// Static `import` / `export`, ES2015 level
    Es2015,
    /// Static `import` / `export` with dynamic import
    Es2020,
    /// Static `import` / `export` with top-level await
    Es2022,
    /// Latest ECMAScript module syntax
    EsNext,
    /// Node 16 resolution, format picked per file
    Node16,
    /// Latest Node resolution, format picked per file
    NodeNext,
    /// Leave module syntax as written
    Preserve,
}

impl ModuleKind {
    /// All supported module kinds
    pub const ALL: [ModuleKind; 11] = [
        Self::CommonJs,
        Self::Amd,
        Self::Umd,
        Self::System,
        Self::Es2015,
        Self::Es2020,
        Self::Es2022,
        Self::EsNext,
        Self::Node16,
        Self::NodeNext,
        Self::Preserve,
    ];

    /// Canonical lowercase name, as written in polyemit.toml
    pub fn name(&self) -> &'static str {
        match self {
            Self::CommonJs => "commonjs",
            Self::Amd => "amd",
            Self::Umd => "umd",
            Self::System => "system",
            Self::Es2015 => "es2015",
            Self::Es2020 => "es2020",
            Self::Es2022 => "es2022",
            Self::EsNext => "esnext",
            Self::Node16 => "node16",
            Self::NodeNext => "nodenext",
            Self::Preserve => "preserve",
        }
    }
}

#[allow(clippy::derivable_impls)]
impl Default for ModuleKind {
    fn default() -> Self {
        Self::CommonJs
    }
}

impl FromStr for ModuleKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| ConfigError::UnknownModuleKind(s.to_string()))
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
