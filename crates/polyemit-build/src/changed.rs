//! Changed-file tracking for incremental consumers

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Set of translation units for which emission was attempted
///
/// Cloning yields another handle to the same set; the owner keeps one handle
/// and gives another to the emit multiplexer, which only appends.
#[derive(Debug, Clone, Default)]
pub struct ChangedFiles {
    inner: Arc<Mutex<BTreeSet<PathBuf>>>,
}

impl ChangedFiles {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a unit. Returns false if it was already recorded.
    pub fn record(&self, unit: &Path) -> bool {
        self.inner.lock().insert(unit.to_path_buf())
    }

    /// Whether a unit has been recorded
    pub fn contains(&self, unit: &Path) -> bool {
        self.inner.lock().contains(unit)
    }

    /// Number of recorded units
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Recorded units, sorted
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Drain recorded units, sorted, leaving the set empty
    pub fn take(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *self.inner.lock()).into_iter().collect()
    }
}
