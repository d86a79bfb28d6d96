//! Filesystem-backed emit host

use crate::emit::EmitHost;
use crate::error::{BuildError, BuildResult};
use crate::options::CompilerOptions;
use std::fs;
use std::path::{Path, PathBuf};

/// Emit host that writes artifacts to disk
#[derive(Debug)]
pub struct FsEmitHost {
    options: CompilerOptions,
    written: Vec<PathBuf>,
}

impl FsEmitHost {
    /// Create a host whose ambient options are `options`
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            written: Vec::new(),
        }
    }

    /// Files written so far, in write order
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    /// Consume the host, returning the written files
    pub fn into_written_files(self) -> Vec<PathBuf> {
        self.written
    }
}

impl EmitHost for FsEmitHost {
    fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    fn write_file(&mut self, path: &Path, contents: &str) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
            }
        }
        fs::write(path, contents).map_err(|e| BuildError::io(path, e))?;
        tracing::trace!(path = %path.display(), bytes = contents.len(), "wrote artifact");
        self.written.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FsEmitHost::new(CompilerOptions::default());
        let path = dir.path().join("out/nested/x.js");

        host.write_file(&path, "export {};\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "export {};\n");
        assert_eq!(host.written_files(), &[path]);
    }

    #[test]
    fn test_write_failure_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let mut host = FsEmitHost::new(CompilerOptions::default());
        let err = host
            .write_file(&blocker.join("x.js"), "")
            .unwrap_err();

        assert!(matches!(err, BuildError::IoError { .. }));
        assert!(host.written_files().is_empty());
    }
}
