use serde::Serialize;

use crate::error::Result;
use super::languages::FileKind;
use super::parser::CodeItem;

/// Existing documentation decomposed into sections.
///
/// A section is `None` when it was never opened, and `Some("")` when its
/// header was present without content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentationRecord {
    pub kind: FileKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub returns: Option<String>,
    pub examples: Option<String>,
    /// Documentation block as it appears in the source
    pub raw_text: String,
}

/// Outcome of looking for a documentation block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(DocumentationRecord),
    NotFound,
}

impl Discovery {
    pub fn record(&self) -> Option<&DocumentationRecord> {
        match self {
            Discovery::Found(record) => Some(record),
            Discovery::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Discovery::Found(_))
    }
}

/// Decompose the documentation detected for one item
pub fn parse_item(item: &CodeItem, kind: FileKind) -> Discovery {
    if !item.has_documentation {
        return Discovery::NotFound;
    }
    Discovery::Found(kind.front_end().decompose(item))
}

/// Locate and decompose the first documentation block in `content`.
///
/// Uses the same recognition rules as extraction. Malformed sources and
/// undocumented files both come back as `NotFound`.
pub fn parse_existing(content: &str, kind: FileKind) -> Result<Discovery> {
    let items = kind.extract(content)?;
    Ok(items
        .iter()
        .find(|item| item.has_documentation)
        .map_or(Discovery::NotFound, |item| parse_item(item, kind)))
}
