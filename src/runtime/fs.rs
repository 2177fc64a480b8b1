//! File system operations.

use anyhow::{Context, Result};
use std::path::Path;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn read_impl(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;
    use tempfile::tempdir;

    #[test]
    fn test_read_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clap.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let runtime = RealRuntime;
        assert_eq!(runtime.read(&path).unwrap(), b"RIFF");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.wav");

        let runtime = RealRuntime;
        let err = runtime.read(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
        assert!(err.to_string().contains("missing.wav"));
    }
}
