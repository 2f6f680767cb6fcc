//! Language front ends for the supported documentation standards
//!
//! Each front end locates documentable units, decomposes their existing
//! documentation into sections and plans the line splices that install new
//! documentation. The set of kinds is closed; `FileKind` picks the front end.

mod python;
mod r;
mod sql;

pub use python::PythonFrontEnd;
pub use r::RFrontEnd;
pub use sql::SqlFrontEnd;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocstampError, Result};
use super::doc_parser::DocumentationRecord;
use super::injector::{InjectionTarget, Splice};
use super::parser::CodeItem;

/// Interface every language front end implements
pub trait LanguageFrontEnd: Sync {
    /// Locate documentable units, in file order
    fn extract(&self, content: &str) -> Result<Vec<CodeItem>>;

    /// Decompose the documentation detected for `item`
    fn decompose(&self, item: &CodeItem) -> DocumentationRecord;

    /// Plan the splices that install each target's documentation.
    ///
    /// Ranges refer to lines of the unmodified `content`.
    fn plan_splices(&self, content: &str, targets: &[InjectionTarget]) -> Result<Vec<Splice>>;

    /// Check rewritten text before it may be persisted
    fn verify(&self, _content: &str) -> Result<()> {
        Ok(())
    }

    /// Get the file extensions this front end handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}

/// Documentation strategy selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Parsed with a grammar; docstring inside the body (Python)
    Structured,
    /// Whole file is one unit; comment block at the top (SQL)
    SingleUnit,
    /// Assignment-to-function pattern with braces; block above (R)
    PatternBrace,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Structured, FileKind::SingleUnit, FileKind::PatternBrace];

    /// Resolve the kind handling `path`
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| DocstampError::UnsupportedFileType(path.display().to_string()))?;
        Self::from_extension(extension)
            .map_err(|_| DocstampError::UnsupportedFileType(path.display().to_string()))
    }

    /// Resolve the kind for a bare extension, case-insensitively
    pub fn from_extension(extension: &str) -> Result<Self> {
        let wanted = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.front_end().file_extensions().contains(&wanted.as_str()))
            .ok_or_else(|| DocstampError::UnsupportedFileType(format!(".{}", extension)))
    }

    pub fn front_end(self) -> &'static dyn LanguageFrontEnd {
        match self {
            FileKind::Structured => &PythonFrontEnd,
            FileKind::SingleUnit => &SqlFrontEnd,
            FileKind::PatternBrace => &RFrontEnd,
        }
    }

    pub fn language_name(self) -> &'static str {
        match self {
            FileKind::Structured => "Python",
            FileKind::SingleUnit => "SQL",
            FileKind::PatternBrace => "R",
        }
    }

    /// Name of the documentation convention this kind follows
    pub fn standard_name(self) -> &'static str {
        match self {
            FileKind::Structured => "NumPy docstring",
            FileKind::SingleUnit => "SQL markdown comment",
            FileKind::PatternBrace => "Roxygen2",
        }
    }

    pub fn extract(self, content: &str) -> Result<Vec<CodeItem>> {
        self.front_end().extract(content)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.language_name())
    }
}

/// Leading whitespace of a line, verbatim
pub(crate) fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::split_lines;

    #[test]
    fn kind_from_extension_is_case_insensitive() {
        assert_eq!(FileKind::from_path(Path::new("a/b.py")).unwrap(), FileKind::Structured);
        assert_eq!(FileKind::from_path(Path::new("q.SQL")).unwrap(), FileKind::SingleUnit);
        assert_eq!(FileKind::from_path(Path::new("stats.R")).unwrap(), FileKind::PatternBrace);
        assert_eq!(FileKind::from_path(Path::new("stats.r")).unwrap(), FileKind::PatternBrace);
        assert_eq!(FileKind::from_extension(".py").unwrap(), FileKind::Structured);
    }

    #[test]
    fn unknown_extensions_are_unsupported() {
        for name in ["notes.txt", "Makefile", "lib.rs"] {
            let err = FileKind::from_path(Path::new(name)).unwrap_err();
            assert!(matches!(err, DocstampError::UnsupportedFileType(_)), "{name}");
        }
    }

    const CORPUS: &[(FileKind, &str)] = &[
        (FileKind::Structured, "import os\n\n@wrap\ndef a(x):\n    \"\"\"Doc.\"\"\"\n    return x\n\nclass B:\n    def m(self):\n        pass\n"),
        (FileKind::Structured, "def f(): return 1\nasync def g(a,\n      b):\n\treturn a\n"),
        (FileKind::Structured, ""),
        (FileKind::SingleUnit, "-- # Title\n-- ## Description\n-- text\n\nSELECT *\nFROM t;\n"),
        (FileKind::SingleUnit, "SELECT 1;"),
        (FileKind::SingleUnit, ""),
        (FileKind::PatternBrace, "#' Doc\nf <- function(x) {\n  x\n}\n\ng = function(y) y + 1\nh <<- \\(z) {\n  \"}\"\n}\n"),
        (FileKind::PatternBrace, "unclosed <- function(x) {\n  x\n"),
    ];

    #[test]
    fn item_spans_match_source_lines() {
        for (kind, content) in CORPUS {
            let lines = split_lines(content);
            for item in kind.extract(content).unwrap() {
                assert!(item.line_start >= 1, "{kind}: {}", item.name);
                assert!(item.line_start <= item.line_end, "{kind}: {}", item.name);
                assert!(item.line_end <= lines.len(), "{kind}: {}", item.name);
                let expected = lines[item.line_start - 1..item.line_end].join("\n");
                assert_eq!(item.source_text, expected, "{kind}: {}", item.name);
            }
        }
    }

    #[test]
    fn items_come_back_in_file_order() {
        for (kind, content) in CORPUS {
            let items = kind.extract(content).unwrap();
            for pair in items.windows(2) {
                assert!(pair[0].line_end < pair[1].line_start, "{kind}");
            }
        }
    }
}
