use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::ProcessingConfig;
use crate::error::{DocstampError, Result};
use super::languages::FileKind;

/// Collect the supported source files under `path`, sorted.
///
/// A file path is returned as-is when its kind is supported. Directories are
/// walked honouring ignore files and hidden-file settings.
pub fn discover<P: AsRef<Path>>(path: P, config: &ProcessingConfig) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DocstampError::FileSystem(format!("Path not found: {}", path.display())));
    }

    if path.is_file() {
        return Ok(if FileKind::from_path(path).is_ok() {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let walker = WalkBuilder::new(path)
        .hidden(!config.include_hidden)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| DocstampError::FileSystem(e.to_string()))?;
        let candidate = entry.path();
        if !candidate.is_file() {
            continue;
        }
        match FileKind::from_path(candidate) {
            Ok(_) => files.push(candidate.to_path_buf()),
            Err(_) => debug!("Skipping unsupported file {}", candidate.display()),
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn walks_supported_files_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["b/report.sql", "a/model.py", "a/notes.md", "stats.R", ".hidden/secret.py"] {
            touch(dir.path(), file);
        }

        let files = discover(dir.path(), &ProcessingConfig::default()).unwrap();
        let relative: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(relative, vec!["a/model.py", "b/report.sql", "stats.R"]);
    }

    #[test]
    fn honours_gitignore_and_hidden_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "build/\n").unwrap();
        for file in ["build/gen.py", "src/main.py", ".venv/lib.py"] {
            touch(dir.path(), file);
        }

        let default = discover(dir.path(), &ProcessingConfig::default()).unwrap();
        assert_eq!(default, vec![dir.path().join("src/main.py")]);

        let everything = ProcessingConfig {
            respect_gitignore: false,
            include_hidden: true,
            ..ProcessingConfig::default()
        };
        assert_eq!(discover(dir.path(), &everything).unwrap().len(), 3);
    }

    #[test]
    fn single_file_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "q.sql");
        touch(dir.path(), "readme.txt");

        let config = ProcessingConfig::default();
        assert_eq!(discover(dir.path().join("q.sql"), &config).unwrap().len(), 1);
        assert!(discover(dir.path().join("readme.txt"), &config).unwrap().is_empty());
        assert!(discover(dir.path().join("missing.py"), &config).is_err());
    }
}
