use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::core::doc_parser::DocumentationRecord;
use crate::core::injector::{corruption, InjectionTarget, Splice};
use crate::core::parser::{split_lines, CodeItem, ItemKind};
use crate::core::scanner::{block_above, DocLine, Section, SectionScanner};
use super::{leading_whitespace, FileKind, LanguageFrontEnd};

const MARKER: &str = "#'";

static FUNCTION_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_.][\w.]*)\s*(?:<<-|<-|=)\s*(?:function|\\)\s*\(")
        .expect("Invalid function declaration regex")
});

/// Roxygen2 front end for R scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct RFrontEnd;

impl LanguageFrontEnd for RFrontEnd {
    fn extract(&self, content: &str) -> Result<Vec<CodeItem>> {
        let lines = split_lines(content);
        let mut items = Vec::new();
        let mut outer = CodeChars::default();
        let mut open_calls = 0usize;
        let mut idx = 0;

        while idx < lines.len() {
            // Assignments inside an argument list (`FUN = function(y)`) are not declarations
            let caps = (open_calls == 0 && !outer.in_string())
                .then(|| FUNCTION_DECLARATION.captures(lines[idx]))
                .flatten();
            let Some(caps) = caps else {
                open_calls = outer.scan(lines[idx]).into_iter().fold(open_calls, call_nesting);
                idx += 1;
                continue;
            };
            let end = body_end(&lines, idx);
            let documentation = doc_block(&lines, idx).map(|block| lines[block].join("\n"));
            items.push(CodeItem::from_span(
                ItemKind::Routine,
                &caps[1],
                &lines,
                idx + 1,
                end + 1,
                documentation,
            ));
            idx = end + 1;
        }

        Ok(items)
    }

    fn decompose(&self, item: &CodeItem) -> DocumentationRecord {
        let mut scanner = SectionScanner::opened_at(Section::Description);
        for line in item.existing_doc_text.lines() {
            scanner.feed(classify(line));
        }
        let sections = scanner.finish();

        DocumentationRecord {
            kind: FileKind::PatternBrace,
            name: Some(item.name.clone()).filter(|name| !name.is_empty()),
            description: sections.description,
            parameters: sections.parameters,
            returns: sections.returns,
            examples: sections.examples,
            raw_text: item.existing_doc_text.clone(),
        }
    }

    fn plan_splices(&self, content: &str, targets: &[InjectionTarget]) -> Result<Vec<Splice>> {
        let lines = split_lines(content);

        targets
            .iter()
            .map(|target| {
                let row = target.item.line_start.saturating_sub(1);
                let declaration = lines
                    .get(row)
                    .filter(|line| FUNCTION_DECLARATION.is_match(line))
                    .ok_or_else(|| {
                        corruption(
                            FileKind::PatternBrace,
                            format!(
                                "no declaration of '{}' at line {}",
                                target.item.name, target.item.line_start
                            ),
                        )
                    })?;

                let start = doc_block(&lines, row).map_or(row, |block| block.start);
                let block = format_block(&target.documentation, leading_whitespace(declaration));
                Ok(Splice::replace(start, row, block))
            })
            .collect()
    }

    fn file_extensions(&self) -> &[&str] {
        &["r"]
    }

    fn language_name(&self) -> &str {
        "r"
    }
}

fn is_marked(line: &str) -> bool {
    line.trim_start().starts_with(MARKER)
}

/// Roxygen block directly above the declaration on `row`
fn doc_block(lines: &[&str], row: usize) -> Option<Range<usize>> {
    block_above(lines, row, is_marked)
}

/// Where the body's delimiters stand while scanning forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    /// Inside the argument list
    Arguments { parens: usize },
    /// Argument list closed, body not started yet
    AwaitingBody,
    /// Inside `{ ... }`
    Braced { depth: usize },
    /// Braceless expression body
    Expression { depth: usize },
}

/// Tracks string literals across lines so their delimiters are ignored
#[derive(Debug, Default)]
struct CodeChars {
    quote: Option<char>,
    escaped: bool,
}

impl CodeChars {
    fn in_string(&self) -> bool {
        self.quote.is_some()
    }

    /// Characters of `line` outside strings and comments
    fn scan(&mut self, line: &str) -> Vec<char> {
        let mut code = Vec::new();
        for ch in line.chars() {
            if let Some(quote) = self.quote {
                if self.escaped {
                    self.escaped = false;
                } else if ch == '\\' {
                    self.escaped = true;
                } else if ch == quote {
                    self.quote = None;
                }
                continue;
            }
            match ch {
                '#' => break,
                '"' | '\'' | '`' => self.quote = Some(ch),
                _ => code.push(ch),
            }
        }
        code
    }
}

/// 0-based last line of the function declared on `start`
fn body_end(lines: &[&str], start: usize) -> usize {
    let mut state = BodyState::Arguments { parens: 0 };
    let mut chars = CodeChars::default();

    for (idx, line) in lines.iter().enumerate().skip(start) {
        let code = chars.scan(line);
        for &ch in &code {
            state = match state {
                BodyState::Arguments { parens } => match ch {
                    '(' => BodyState::Arguments { parens: parens + 1 },
                    ')' if parens <= 1 => BodyState::AwaitingBody,
                    ')' => BodyState::Arguments { parens: parens - 1 },
                    _ => state,
                },
                BodyState::AwaitingBody => match ch {
                    '{' => BodyState::Braced { depth: 1 },
                    c if c.is_whitespace() => state,
                    c => BodyState::Expression { depth: nesting(0, c) },
                },
                BodyState::Braced { depth } => match ch {
                    '{' => BodyState::Braced { depth: depth + 1 },
                    '}' if depth <= 1 => return idx,
                    '}' => BodyState::Braced { depth: depth - 1 },
                    _ => state,
                },
                BodyState::Expression { depth } => BodyState::Expression { depth: nesting(depth, ch) },
            };
        }

        if state == (BodyState::Expression { depth: 0 }) && !ends_with_operator(&code) {
            return idx;
        }
    }

    match state {
        BodyState::AwaitingBody => start,
        _ => lines.len().saturating_sub(1),
    }
}

/// Whether the code on a line stops after a binary operator or comma
fn ends_with_operator(code: &[char]) -> bool {
    matches!(
        code.iter().rev().find(|ch| !ch.is_whitespace()),
        Some('+' | '-' | '*' | '/' | '^' | '&' | '|' | '<' | '>' | '=' | '!' | '~' | ',' | '%')
    )
}

/// Depth of unclosed `(` and `[` outside function bodies
fn call_nesting(depth: usize, ch: char) -> usize {
    match ch {
        '(' | '[' => depth + 1,
        ')' | ']' => depth.saturating_sub(1),
        _ => depth,
    }
}

fn nesting(depth: usize, ch: char) -> usize {
    match ch {
        '(' | '[' | '{' => depth + 1,
        ')' | ']' | '}' => depth.saturating_sub(1),
        _ => depth,
    }
}

fn classify(line: &str) -> DocLine {
    let trimmed = line.trim();
    let Some(body) = trimmed.strip_prefix(MARKER) else {
        return DocLine::Content(trimmed.to_string());
    };
    let body = body.trim();

    let Some(tag_line) = body.strip_prefix('@') else {
        return DocLine::Content(body.to_string());
    };
    let (tag, rest) = tag_line
        .split_once(char::is_whitespace)
        .map(|(tag, rest)| (tag, rest.trim()))
        .unwrap_or((tag_line, ""));
    let inline = (!rest.is_empty()).then(|| rest.to_string());

    match tag {
        "param" => DocLine::Header {
            section: Section::Parameters,
            inline: Some(body.to_string()),
        },
        "return" | "returns" => DocLine::Header {
            section: Section::Returns,
            inline,
        },
        "examples" | "example" => DocLine::Header {
            section: Section::Examples,
            inline,
        },
        "description" => DocLine::Header {
            section: Section::Description,
            inline,
        },
        "export" => DocLine::Skip,
        _ => DocLine::Content(body.to_string()),
    }
}

/// Prefix every line with the Roxygen marker at the declaration's indent
fn format_block(documentation: &str, indent: &str) -> Vec<String> {
    documentation
        .trim_matches('\n')
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.trim().is_empty() {
                format!("{}{}", indent, MARKER)
            } else if is_marked(line) {
                format!("{}{}", indent, line.trim_start())
            } else {
                format!("{}{} {}", indent, MARKER, line)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::injector::inject;

    fn extract(content: &str) -> Vec<CodeItem> {
        RFrontEnd.extract(content).unwrap()
    }

    #[test]
    fn brace_balance_ends_the_item() {
        let items = extract("calc <- function(x) {\n  x*2\n}\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "calc");
        assert_eq!((items[0].line_start, items[0].line_end), (1, 3));
        assert!(!items[0].has_documentation);
    }

    #[test]
    fn assignment_forms_are_recognized() {
        let content = "a = function(x) {\n  x\n}\nb <<- function() NULL\n  my.fun_2 <- \\(y) {\n  y\n  }\nnot_a_function <- 42\n";
        let names: Vec<String> = extract(content).into_iter().map(|item| item.name).collect();
        assert_eq!(names, vec!["a", "b", "my.fun_2"]);
    }

    #[test]
    fn braces_in_strings_and_comments_are_ignored() {
        let content = "f <- function(x) {\n  s <- \"}\"  # }\n  t <- '{'\n  x\n}\ng <- function() {\n}\n";
        let items = extract(content);
        assert_eq!((items[0].line_start, items[0].line_end), (1, 5));
        assert_eq!((items[1].line_start, items[1].line_end), (6, 7));
    }

    #[test]
    fn braceless_bodies_end_with_their_expression() {
        let content = "sq <- function(x) x^2\nadd <- function(a, b)\n  paste(a,\n        b)\nnext_one <- function() {\n  1\n}\n";
        let items = extract(content);
        assert_eq!((items[0].line_start, items[0].line_end), (1, 1));
        assert_eq!((items[1].line_start, items[1].line_end), (2, 4));
        assert_eq!((items[2].line_start, items[2].line_end), (5, 7));
    }

    #[test]
    fn callbacks_inside_calls_are_not_items() {
        let content = "res <- lapply(xs,\n  FUN = function(y) {\n    y\n  })\n\nafter <- function(z) {\n  z\n}\n";
        let items = extract(content);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "after");
        assert_eq!((items[0].line_start, items[0].line_end), (6, 8));

        let output = inject(
            content,
            &[InjectionTarget::new(items[0].clone(), "Identity.\n@param z Value.\n@return z.")],
            FileKind::PatternBrace,
        )
        .unwrap();
        assert!(output.starts_with("res <- lapply(xs,\n  FUN = function(y) {\n"));
        assert!(output.contains("\n#' Identity.\n#' @param z Value.\n#' @return z.\nafter <- function(z) {"));
    }

    #[test]
    fn call_brackets_in_strings_do_not_hide_declarations() {
        let items = extract("msg <- \"(unbalanced\"\ng <- function() {\n  1\n}\n");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "g");
    }

    #[test]
    fn expression_continues_after_trailing_operator() {
        let content = "f <- function(x) x +\n  1\ng <- function(df) df |>\n  head()\nh <- function() 2\n";
        let items = extract(content);
        assert_eq!((items[0].line_start, items[0].line_end), (1, 2));
        assert_eq!(items[0].source_text, "f <- function(x) x +\n  1");
        assert_eq!((items[1].line_start, items[1].line_end), (3, 4));
        assert_eq!((items[2].line_start, items[2].line_end), (5, 5));
    }

    #[test]
    fn body_on_the_next_line() {
        let items = extract("f <- function(x)\n{\n  x\n}\n");
        assert_eq!((items[0].line_start, items[0].line_end), (1, 4));
    }

    #[test]
    fn unclosed_body_runs_to_end_of_file() {
        let items = extract("f <- function(x) {\n  x\n\n");
        assert_eq!(items[0].line_end, 3);
    }

    #[test]
    fn nested_functions_are_not_separate_items() {
        let content = "outer <- function() {\n  inner <- function(y) {\n    y\n  }\n  inner(1)\n}\n";
        let items = extract(content);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_end, 6);
    }

    #[test]
    fn roxygen_block_must_touch_the_declaration() {
        let content = "#' Detached\n\nf <- function() {\n}\n#' Attached\n#' @export\ng <- function() {\n}\n";
        let items = extract(content);
        assert!(!items[0].has_documentation);
        assert!(items[1].has_documentation);
        assert_eq!(items[1].existing_doc_text, "#' Attached\n#' @export");
    }

    #[test]
    fn decompose_reads_roxygen_tags() {
        let content = "#' Weighted mean of a vector.\n#'\n#' @param x Numeric vector.\n#' @param w Weights,\n#'   same length as x.\n#' @return The weighted mean.\n#' @examples\n#' wmean(1:3, c(1, 1, 2))\n#' @export\nwmean <- function(x, w) {\n  sum(x * w) / sum(w)\n}\n";
        let record = RFrontEnd.decompose(&extract(content)[0]);
        assert_eq!(record.name.as_deref(), Some("wmean"));
        assert_eq!(record.description.as_deref(), Some("Weighted mean of a vector."));
        assert_eq!(
            record.parameters.as_deref(),
            Some("@param x Numeric vector.\n@param w Weights,\nsame length as x.")
        );
        assert_eq!(record.returns.as_deref(), Some("The weighted mean."));
        assert_eq!(record.examples.as_deref(), Some("wmean(1:3, c(1, 1, 2))"));
    }

    #[test]
    fn injection_goes_directly_above_the_declaration() {
        let content = "x <- 1\n\nif (TRUE) {\n  helper <- function(a) {\n    a\n  }\n}\n";
        let items = extract(content);
        assert_eq!(items[0].name, "helper");
        let output = inject(
            content,
            &[InjectionTarget::new(items[0].clone(), "Return a.\n\n@param a Value.")],
            FileKind::PatternBrace,
        )
        .unwrap();
        assert_eq!(
            output,
            "x <- 1\n\nif (TRUE) {\n  #' Return a.\n  #'\n  #' @param a Value.\n  helper <- function(a) {\n    a\n  }\n}\n"
        );
    }

    #[test]
    fn injection_replaces_the_existing_block() {
        let content = "#' Old title\n#' @param x old\nf <- function(x) {\n  x\n}\n";
        let item = extract(content).remove(0);
        let output = inject(
            content,
            &[InjectionTarget::new(item, "#' New title\n#' @param x Input value.\n#' @return x unchanged.")],
            FileKind::PatternBrace,
        )
        .unwrap();
        assert_eq!(
            output,
            "#' New title\n#' @param x Input value.\n#' @return x unchanged.\nf <- function(x) {\n  x\n}\n"
        );
    }
}
