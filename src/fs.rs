//! Source tree access
//!
//! The resolver and graph builder read sources through [`SourceFs`] so tests
//! can run against an in-memory tree.

use std::path::Path;

/// Read-only view of the project sources
pub trait SourceFs: Sync {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;
}

/// Local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl SourceFs for LocalFs {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// In-memory source tree for tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: std::collections::BTreeMap<std::path::PathBuf, String>,
}

#[cfg(test)]
impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<std::path::PathBuf>, content: &str) -> Self {
        self.files.insert(path.into(), content.to_string());
        self
    }
}

#[cfg(test)]
impl SourceFs for MemoryFs {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string())
        })
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files.keys().any(|f| f.starts_with(path) && f != path)
    }
}
