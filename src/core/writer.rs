use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{DocstampError, Result};
use super::parser::content_hash;

/// Replaces source files without ever exposing a partially written file
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicWriter;

impl AtomicWriter {
    pub fn new() -> Self {
        Self
    }

    /// Replace `path` with `content` if it still hashes to `expected_hash`.
    ///
    /// The new content is written to a temporary file in the same directory,
    /// given the original permissions, synced, and renamed over the original.
    pub fn replace(&self, path: &Path, content: &str, expected_hash: &str) -> Result<()> {
        let current = std::fs::read_to_string(path)?;
        if content_hash(&current) != expected_hash {
            return Err(DocstampError::ConcurrentModification {
                path: path.to_path_buf(),
            });
        }

        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let permissions = std::fs::metadata(path)?.permissions();

        let mut staged = NamedTempFile::new_in(directory)?;
        staged.write_all(content.as_bytes())?;
        staged.flush()?;
        std::fs::set_permissions(staged.path(), permissions)?;
        staged.as_file().sync_all()?;

        staged
            .persist(path)
            .map_err(|e| DocstampError::FileSystem(format!("Failed to replace {}: {}", path.display(), e.error)))?;

        debug!("Replaced {} ({} bytes)", path.display(), content.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_content_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("query.sql");
        std::fs::write(&path, "SELECT 1;\n").unwrap();

        AtomicWriter::new()
            .replace(&path, "-- # Ping\n\nSELECT 1;\n", &content_hash("SELECT 1;\n"))
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "-- # Ping\n\nSELECT 1;\n");
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn refuses_when_file_changed_since_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.R");
        std::fs::write(&path, "f <- function() {\n}\n").unwrap();
        let stale = content_hash("something else");

        let err = AtomicWriter::new().replace(&path, "rewritten", &stale).unwrap_err();
        assert!(matches!(err, DocstampError::ConcurrentModification { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "f <- function() {\n}\n");
    }

    #[cfg(unix)]
    #[test]
    fn keeps_original_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.py");
        std::fs::write(&path, "def f():\n    pass\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        AtomicWriter::new()
            .replace(&path, "def f():\n    return 1\n", &content_hash("def f():\n    pass\n"))
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
