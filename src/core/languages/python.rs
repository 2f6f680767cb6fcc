use tree_sitter::{Node, Parser, Point, Tree};
use tracing::debug;

use crate::error::{DocstampError, Result};
use crate::core::doc_parser::DocumentationRecord;
use crate::core::injector::{corruption, InjectionTarget, Splice};
use crate::core::parser::{split_lines, CodeItem, ItemKind};
use crate::core::scanner::{DocLine, Section, SectionScanner};
use super::{leading_whitespace, FileKind, LanguageFrontEnd};

/// One nesting level added when a body has to be opened on a new line
const INDENT_UNIT: &str = "    ";

/// NumPy-docstring front end for Python sources
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonFrontEnd;

impl LanguageFrontEnd for PythonFrontEnd {
    fn extract(&self, content: &str) -> Result<Vec<CodeItem>> {
        let Some(tree) = parse(content)? else {
            return Ok(Vec::new());
        };
        let root = tree.root_node();
        if root.has_error() {
            debug!("Python source does not parse; no documentable items");
            return Ok(Vec::new());
        }

        let lines = split_lines(content);
        let items = top_level_declarations(root)
            .into_iter()
            .filter_map(|(node, kind)| {
                let name = node
                    .child_by_field_name("name")?
                    .utf8_text(content.as_bytes())
                    .ok()?
                    .to_string();
                let (first_row, last_row) = row_span(node, lines.len());
                let docstring = first_statement(node)
                    .and_then(|statement| docstring_literal(statement, content))
                    .map(|literal| clean_docstring(&literal_value(literal)));

                Some(CodeItem::from_span(kind, name, &lines, first_row + 1, last_row + 1, docstring))
            })
            .collect();

        Ok(items)
    }

    fn decompose(&self, item: &CodeItem) -> DocumentationRecord {
        let cleaned = &item.existing_doc_text;
        let mut scanner = SectionScanner::opened_at(Section::Description);
        let lines: Vec<&str> = cleaned.lines().collect();

        let mut idx = 0;
        while idx < lines.len() {
            match section_header(lines[idx]) {
                Some(section) => {
                    scanner.feed(DocLine::Header { section, inline: None });
                    if lines.get(idx + 1).map_or(false, |next| is_underline(next)) {
                        idx += 1;
                    }
                }
                None => scanner.feed(DocLine::Content(lines[idx].to_string())),
            }
            idx += 1;
        }

        let sections = scanner.finish();
        DocumentationRecord {
            kind: FileKind::Structured,
            name: Some(item.name.clone()),
            description: sections.description,
            parameters: sections.parameters,
            returns: sections.returns,
            examples: sections.examples,
            raw_text: format!("\"\"\"\n{}\n\"\"\"", cleaned),
        }
    }

    fn plan_splices(&self, content: &str, targets: &[InjectionTarget]) -> Result<Vec<Splice>> {
        let tree = parse(content)?
            .filter(|tree| !tree.root_node().has_error())
            .ok_or_else(|| corruption(FileKind::Structured, "original source does not parse"))?;
        let lines = split_lines(content);
        let declarations = top_level_declarations(tree.root_node());

        targets
            .iter()
            .map(|target| {
                let row = target.item.line_start.saturating_sub(1);
                let (node, _) = declarations
                    .iter()
                    .find(|(node, _)| node.start_position().row == row)
                    .ok_or_else(|| {
                        corruption(
                            FileKind::Structured,
                            format!(
                                "no top-level declaration of '{}' at line {}",
                                target.item.name, target.item.line_start
                            ),
                        )
                    })?;
                body_splice(*node, content, &lines, &target.documentation)
            })
            .collect()
    }

    fn verify(&self, content: &str) -> Result<()> {
        match parse(content)? {
            Some(tree) if !tree.root_node().has_error() => Ok(()),
            _ => Err(corruption(FileKind::Structured, "rewritten source no longer parses")),
        }
    }

    fn file_extensions(&self) -> &[&str] {
        &["py"]
    }

    fn language_name(&self) -> &str {
        "python"
    }
}

fn parse(content: &str) -> Result<Option<Tree>> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| DocstampError::Parser(format!("Failed to set Python language: {}", e)))?;
    Ok(parser.parse(content, None))
}

/// Routines and classes declared directly in the module body.
///
/// Methods and inner functions are not visited.
fn top_level_declarations(root: Node<'_>) -> Vec<(Node<'_>, ItemKind)> {
    let mut cursor = root.walk();
    let declarations = root.named_children(&mut cursor).filter_map(declaration).collect();
    declarations
}

fn declaration(node: Node<'_>) -> Option<(Node<'_>, ItemKind)> {
    match node.kind() {
        "function_definition" => Some((node, ItemKind::Routine)),
        "class_definition" => Some((node, ItemKind::StructuredType)),
        "decorated_definition" => node.child_by_field_name("definition").and_then(declaration),
        _ => None,
    }
}

/// 0-based first and last row covered by `node`
fn row_span(node: Node<'_>, line_count: usize) -> (usize, usize) {
    let start = node.start_position().row;
    let end = last_row(node.end_position(), start);
    (start, end.min(line_count.saturating_sub(1)).max(start))
}

fn last_row(end: Point, start_row: usize) -> usize {
    if end.column == 0 && end.row > start_row {
        end.row - 1
    } else {
        end.row
    }
}

fn first_statement(declaration: Node<'_>) -> Option<Node<'_>> {
    let body = declaration.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let statement = body.named_children(&mut cursor).find(|child| child.kind() != "comment");
    statement
}

/// Source text of the string literal when `statement` is a docstring
fn docstring_literal<'a>(statement: Node<'_>, content: &'a str) -> Option<&'a str> {
    if statement.kind() != "expression_statement" || statement.named_child_count() != 1 {
        return None;
    }
    let expression = statement.named_child(0)?;
    if expression.kind() != "string" {
        return None;
    }

    let literal = expression.utf8_text(content.as_bytes()).ok()?;
    let prefix = &literal[..literal.len() - literal.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len()];
    prefix
        .chars()
        .all(|c| matches!(c, 'r' | 'R' | 'u' | 'U'))
        .then_some(literal)
}

/// Value of a string literal with prefix letters and quotes removed
fn literal_value(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner.to_string();
        }
    }
    body.to_string()
}

/// Normalize docstring indentation.
///
/// Tabs are expanded, the first line is stripped, the common indentation of
/// the remaining lines is removed, and blank lines at either end are dropped.
pub(crate) fn clean_docstring(value: &str) -> String {
    let expanded: Vec<String> = value.split('\n').map(expand_tabs).collect();
    let margin = expanded
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    let mut lines: Vec<String> = expanded
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let line = if idx == 0 {
                line.trim_start()
            } else {
                let cut = line.bytes().take(margin).take_while(|b| *b == b' ').count();
                &line[cut..]
            };
            line.trim_end().to_string()
        })
        .collect();

    while lines.last().map_or(false, |line| line.is_empty()) {
        lines.pop();
    }
    let first = lines.iter().position(|line| !line.is_empty()).unwrap_or(lines.len());
    lines.drain(..first);
    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let width = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(width));
            column += width;
        } else {
            out.push(ch);
            column += 1;
        }
    }
    out
}

fn section_header(line: &str) -> Option<Section> {
    match line.trim() {
        "Parameters" => Some(Section::Parameters),
        "Returns" => Some(Section::Returns),
        "Examples" | "Example" => Some(Section::Examples),
        _ => None,
    }
}

fn is_underline(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c == '-')
}

/// Splice that puts `documentation` at the top of the declaration's body
fn body_splice(declaration: Node<'_>, content: &str, lines: &[&str], documentation: &str) -> Result<Splice> {
    let statement = first_statement(declaration)
        .ok_or_else(|| corruption(FileKind::Structured, "declaration has no body"))?;
    let body_start = statement.start_position();
    let existing = docstring_literal(statement, content).map(|_| statement);

    let line = lines.get(body_start.row).copied().unwrap_or_default();
    let starts_line = line.get(..body_start.column).map_or(false, |head| head.trim().is_empty());

    if starts_line {
        let indent = leading_whitespace(line);
        let mut replacement = format_docstring(documentation, indent);
        match existing {
            Some(old) => {
                let end = old.end_position();
                if let Some(rest) = lines.get(end.row).and_then(|l| remainder_after(l, end.column)) {
                    replacement.push(format!("{}{}", indent, rest));
                }
                Ok(Splice::replace(body_start.row, end.row + 1, replacement))
            }
            None => Ok(Splice::insert(body_start.row, replacement)),
        }
    } else {
        // Body shares a line with the header; open it on its own lines
        let header_line = lines
            .get(declaration.start_position().row)
            .copied()
            .unwrap_or_default();
        let indent = format!("{}{}", leading_whitespace(header_line), INDENT_UNIT);
        let head = line.get(..body_start.column).unwrap_or(line).trim_end();

        let (last_row, rest) = match existing {
            Some(old) => {
                let end = old.end_position();
                let rest = lines.get(end.row).and_then(|l| remainder_after(l, end.column));
                (end.row, rest)
            }
            None => (body_start.row, remainder_after(line, body_start.column)),
        };

        let mut replacement = vec![head.to_string()];
        replacement.extend(format_docstring(documentation, &indent));
        if let Some(rest) = rest {
            replacement.push(format!("{}{}", indent, rest));
        }
        Ok(Splice::replace(body_start.row, last_row + 1, replacement))
    }
}

/// Code left on a line after `column`, minus a separating semicolon
fn remainder_after(line: &str, column: usize) -> Option<String> {
    let rest = line.get(column..)?.trim();
    let rest = rest.strip_prefix(';').map(str::trim_start).unwrap_or(rest);
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Render documentation text as a docstring statement indented by `indent`
pub(crate) fn format_docstring(documentation: &str, indent: &str) -> Vec<String> {
    let text = clean_docstring(unwrap_quotes(documentation.trim()));
    let prefix = if text.contains('\\') { "r" } else { "" };
    let text = text.replace("\"\"\"", "\\\"\\\"\\\"");

    if !text.contains('\n') && !text.ends_with('"') && !text.ends_with('\\') {
        return vec![format!("{}{}\"\"\"{}\"\"\"", indent, prefix, text)];
    }

    let mut out = vec![format!("{}{}\"\"\"", indent, prefix)];
    out.extend(text.lines().map(|line| {
        if line.trim().is_empty() {
            String::new()
        } else {
            format!("{}{}", indent, line)
        }
    }));
    out.push(format!("{}\"\"\"", indent));
    out
}

/// Strip a surrounding triple-quoted literal from generated text
fn unwrap_quotes(text: &str) -> &str {
    let body = text
        .strip_prefix('r')
        .or_else(|| text.strip_prefix('R'))
        .unwrap_or(text);
    for quote in ["\"\"\"", "'''"] {
        if let Some(inner) = body.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}
