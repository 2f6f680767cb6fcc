use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ProcessingConfig;
use crate::error::{DocstampError, Result};
use super::languages::FileKind;

/// Kind of documentable unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Function or procedure
    Routine,
    /// Class-like declaration
    StructuredType,
    /// Whole-file query unit
    QueryUnit,
}

/// A documentable unit located in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeItem {
    /// Declared name, or a placeholder for anonymous query units
    pub name: String,

    /// Kind of unit
    pub kind: ItemKind,

    /// Exact text of lines `line_start..=line_end`
    pub source_text: String,

    /// 1-based first line of the declaration (after any decorators)
    pub line_start: usize,

    /// 1-based last line of the unit, inclusive
    pub line_end: usize,

    /// Whether documentation was detected for this unit
    pub has_documentation: bool,

    /// Detected documentation text, empty when none was found
    pub existing_doc_text: String,
}

impl CodeItem {
    /// Build an item whose source text is sliced from `lines`.
    ///
    /// `existing_doc` is `Some` whenever documentation was detected, even if
    /// its text is empty.
    pub(crate) fn from_span(
        kind: ItemKind,
        name: impl Into<String>,
        lines: &[&str],
        line_start: usize,
        line_end: usize,
        existing_doc: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source_text: span_text(lines, line_start, line_end),
            line_start,
            line_end,
            has_documentation: existing_doc.is_some(),
            existing_doc_text: existing_doc.unwrap_or_default(),
        }
    }
}

/// Split text into lines on `\n`.
///
/// A trailing newline does not start a new line, and empty text is a single
/// empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.strip_suffix('\n').unwrap_or(text).split('\n').collect()
}

/// Join the 1-based inclusive line range `start..=end`
pub(crate) fn span_text(lines: &[&str], start: usize, end: usize) -> String {
    let first = start.saturating_sub(1).min(lines.len());
    let last = end.min(lines.len()).max(first);
    lines[first..last].join("\n")
}

/// SHA-256 of the text, hex encoded
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A source file read from disk, with the hash it had when read
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub text: String,
    pub content_hash: String,
}

impl SourceFile {
    /// Extract the documentable units of this file
    pub fn extract(&self) -> Result<Vec<CodeItem>> {
        self.kind.extract(&self.text)
    }
}

/// Reads source files and hands them to the matching front end
#[derive(Debug, Clone)]
pub struct CodeParser {
    config: ProcessingConfig,
}

impl CodeParser {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Read a single source file.
    ///
    /// The kind is resolved before the file is touched, so unsupported
    /// extensions fail without any I/O.
    pub fn read_source<P: AsRef<Path>>(&self, file_path: P) -> Result<SourceFile> {
        let path = file_path.as_ref();
        let kind = FileKind::from_path(path)?;

        let metadata = std::fs::metadata(path)?;
        if metadata.len() as usize > self.config.max_file_size {
            return Err(DocstampError::FileSystem(format!(
                "File {} exceeds maximum size limit",
                path.display()
            )));
        }

        let text = std::fs::read_to_string(path)?;
        let content_hash = content_hash(&text);

        Ok(SourceFile {
            path: path.to_path_buf(),
            kind,
            text,
            content_hash,
        })
    }

    /// Read a file and extract its items
    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> Result<(SourceFile, Vec<CodeItem>)> {
        let source = self.read_source(file_path)?;
        let items = source.extract()?;
        Ok((source, items))
    }
}
