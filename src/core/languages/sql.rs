use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::core::doc_parser::DocumentationRecord;
use crate::core::injector::{InjectionTarget, Splice};
use crate::core::parser::{split_lines, CodeItem, ItemKind};
use crate::core::scanner::{leading_block, DocLine, Section, SectionScanner};
use super::{FileKind, LanguageFrontEnd};

/// Name given to query files that declare no routine
pub const PLACEHOLDER_NAME: &str = "SQL Query";

static ROUTINE_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCREATE\s+(?:OR\s+REPLACE\s+)?(?:FUNCTION|PROCEDURE)\s+([\w.]+)")
        .expect("Invalid routine declaration regex")
});

/// Markdown-in-comments front end for SQL files
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlFrontEnd;

impl LanguageFrontEnd for SqlFrontEnd {
    fn extract(&self, content: &str) -> Result<Vec<CodeItem>> {
        let lines = split_lines(content);
        let name = lines
            .iter()
            .find_map(|line| ROUTINE_DECLARATION.captures(line))
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| PLACEHOLDER_NAME.to_string());
        let documentation = doc_block(&lines).map(|block| lines[block].join("\n"));

        Ok(vec![CodeItem::from_span(
            ItemKind::QueryUnit,
            name,
            &lines,
            1,
            lines.len(),
            documentation,
        )])
    }

    fn decompose(&self, item: &CodeItem) -> DocumentationRecord {
        let mut scanner = SectionScanner::new();
        for line in item.existing_doc_text.lines() {
            scanner.feed(classify(line));
        }
        let sections = scanner.finish();

        DocumentationRecord {
            kind: FileKind::SingleUnit,
            name: sections.name,
            description: sections.description,
            parameters: sections.parameters,
            returns: sections.returns,
            examples: sections.examples,
            raw_text: item.existing_doc_text.clone(),
        }
    }

    fn plan_splices(&self, content: &str, targets: &[InjectionTarget]) -> Result<Vec<Splice>> {
        // The whole file is a single unit, so only one block can be installed
        let Some(target) = targets.last() else {
            return Ok(Vec::new());
        };
        let lines = split_lines(content);

        let end = match doc_block(&lines) {
            Some(block) => {
                let after = block.end;
                if lines.get(after).map_or(false, |line| line.trim().is_empty()) {
                    after + 1
                } else {
                    after
                }
            }
            None => 0,
        };

        let mut replacement = format_block(&target.documentation);
        if !replacement.first().map_or(false, |line| is_title(line)) {
            replacement.insert(0, format!("-- # {}", target.item.name));
        }
        replacement.push(String::new());
        Ok(vec![Splice::replace(0, end, replacement)])
    }

    fn file_extensions(&self) -> &[&str] {
        &["sql"]
    }

    fn language_name(&self) -> &str {
        "sql"
    }
}

fn is_block_header(line: &str) -> bool {
    line.trim_start().starts_with("-- #")
}

/// `-- # Title` line that opens a documentation block
fn is_title(line: &str) -> bool {
    is_block_header(line) && matches!(classify(line), DocLine::Name(_))
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("--")
}

/// Leading documentation block: header first, then comment lines
fn doc_block(lines: &[&str]) -> Option<Range<usize>> {
    leading_block(lines, is_block_header, is_comment)
}

fn classify(line: &str) -> DocLine {
    let trimmed = line.trim();
    let Some(body) = trimmed.strip_prefix("--") else {
        return DocLine::Content(trimmed.to_string());
    };
    let body = body.trim();

    if let Some(header) = body.strip_prefix("##") {
        let section = match header.trim().to_ascii_lowercase().as_str() {
            "description" => Some(Section::Description),
            "parameters" | "params" | "arguments" => Some(Section::Parameters),
            "returns" | "return" => Some(Section::Returns),
            "example" | "examples" => Some(Section::Examples),
            _ => None,
        };
        return match section {
            Some(section) => DocLine::Header { section, inline: None },
            None => DocLine::Content(body.to_string()),
        };
    }

    if let Some(title) = body.strip_prefix('#') {
        if !title.starts_with('#') {
            return DocLine::Name(title.trim().to_string());
        }
    }

    DocLine::Content(body.to_string())
}

/// Prefix every line with the comment marker
fn format_block(documentation: &str) -> Vec<String> {
    documentation
        .trim_matches('\n')
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.trim().is_empty() {
                "--".to_string()
            } else if line.trim_start().starts_with("--") {
                line.trim_start().to_string()
            } else {
                format!("-- {}", line)
            }
        })
        .collect()
}
