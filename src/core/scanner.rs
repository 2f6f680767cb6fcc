//! Line scanners shared by the documentation front ends
//!
//! Documentation handling is split into two small state machines: one that
//! locates a contiguous documentation block among source lines, and one that
//! splits the lines of a located block into named sections. Each language only
//! decides how a single line is classified.

use std::ops::Range;

/// Named section of a documentation block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Description,
    Parameters,
    Returns,
    Examples,
}

impl Section {
    const ALL: [Section; 4] = [
        Section::Description,
        Section::Parameters,
        Section::Returns,
        Section::Examples,
    ];

    fn index(self) -> usize {
        match self {
            Section::Description => 0,
            Section::Parameters => 1,
            Section::Returns => 2,
            Section::Examples => 3,
        }
    }
}

/// Position of a scanner relative to a documentation block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    OutsideBlock,
    InBlock,
    InSection(Section),
}

/// Classification of one documentation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocLine {
    /// Title line naming the documented unit
    Name(String),
    /// Recognized section header, optionally carrying content on the same line
    Header {
        section: Section,
        inline: Option<String>,
    },
    /// Content for whichever section is open
    Content(String),
    /// Line that carries no content (tags such as `@export`)
    Skip,
}

/// Locate a block that must start at the first non-blank line.
///
/// Blank lines before the block are allowed; any other line that does not
/// open a block means there is no leading block.
pub fn leading_block<O, C>(lines: &[&str], opens: O, continues: C) -> Option<Range<usize>>
where
    O: Fn(&str) -> bool,
    C: Fn(&str) -> bool,
{
    let mut state = ScanState::OutsideBlock;
    let mut start = 0;

    for (idx, line) in lines.iter().enumerate() {
        match state {
            ScanState::OutsideBlock => {
                if opens(line) {
                    state = ScanState::InBlock;
                    start = idx;
                } else if !line.trim().is_empty() {
                    return None;
                }
            }
            _ => {
                if !continues(line) {
                    return Some(start..idx);
                }
            }
        }
    }

    match state {
        ScanState::OutsideBlock => None,
        _ => Some(start..lines.len()),
    }
}

/// Locate the contiguous run of marker lines directly above `anchor`.
///
/// The run must touch the anchor line; a blank or unmarked line ends it.
pub fn block_above<M>(lines: &[&str], anchor: usize, is_marked: M) -> Option<Range<usize>>
where
    M: Fn(&str) -> bool,
{
    let mut state = ScanState::OutsideBlock;
    let mut start = anchor;

    for idx in (0..anchor.min(lines.len())).rev() {
        if !is_marked(lines[idx]) {
            break;
        }
        state = ScanState::InBlock;
        start = idx;
    }

    (state == ScanState::InBlock).then(|| start..anchor)
}

/// Section contents recovered from a documentation block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub name: Option<String>,
    pub description: Option<String>,
    pub parameters: Option<String>,
    pub returns: Option<String>,
    pub examples: Option<String>,
}

/// Splits the lines of one located block into sections
#[derive(Debug)]
pub struct SectionScanner {
    state: ScanState,
    name: Option<String>,
    buffers: [Option<Vec<String>>; 4],
    implicit: Option<Section>,
}

impl SectionScanner {
    /// Scanner that drops content until the first header
    pub fn new() -> Self {
        Self {
            state: ScanState::InBlock,
            name: None,
            buffers: Default::default(),
            implicit: None,
        }
    }

    /// Scanner whose block opens directly into `section` without a header.
    ///
    /// An implicitly opened section only counts as present when it ends up
    /// with non-blank content.
    pub fn opened_at(section: Section) -> Self {
        let mut scanner = Self::new();
        scanner.state = ScanState::InSection(section);
        scanner.implicit = Some(section);
        scanner
    }

    #[cfg(test)]
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn feed(&mut self, line: DocLine) {
        match line {
            DocLine::Name(name) => {
                if self.name.is_none() && !name.trim().is_empty() {
                    self.name = Some(name.trim().to_string());
                }
            }
            DocLine::Header { section, inline } => {
                self.state = ScanState::InSection(section);
                if self.implicit == Some(section) {
                    self.implicit = None;
                }
                let buffer = self.buffers[section.index()].get_or_insert_with(Vec::new);
                if let Some(text) = inline {
                    buffer.push(text);
                }
            }
            DocLine::Content(text) => {
                if let ScanState::InSection(section) = self.state {
                    self.buffers[section.index()]
                        .get_or_insert_with(Vec::new)
                        .push(text);
                }
            }
            DocLine::Skip => {}
        }
    }

    pub fn finish(self) -> Sections {
        let implicit = self.implicit;
        let mut joined: [Option<String>; 4] = Default::default();

        for (section, buffer) in Section::ALL.into_iter().zip(self.buffers) {
            let Some(lines) = buffer else { continue };
            let text = lines.join("\n").trim().to_string();
            if implicit == Some(section) && text.is_empty() {
                continue;
            }
            joined[section.index()] = Some(text);
        }

        let [description, parameters, returns, examples] = joined;
        Sections {
            name: self.name,
            description,
            parameters,
            returns,
            examples,
        }
    }
}

impl Default for SectionScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_comment(line: &str) -> bool {
        line.trim_start().starts_with("--")
    }

    fn is_header(line: &str) -> bool {
        line.trim_start().starts_with("-- #")
    }

    #[test]
    fn leading_block_skips_blank_lines_before_header() {
        let lines = ["", "-- # Title", "-- body", "SELECT 1;"];
        assert_eq!(leading_block(&lines, is_header, is_comment), Some(1..3));
    }

    #[test]
    fn leading_block_requires_header_first() {
        let lines = ["-- plain comment", "-- # Title", "SELECT 1;"];
        assert_eq!(leading_block(&lines, is_header, is_comment), None);
    }

    #[test]
    fn leading_block_may_run_to_end_of_file() {
        let lines = ["-- # Title", "-- only docs"];
        assert_eq!(leading_block(&lines, is_header, is_comment), Some(0..2));
    }

    #[test]
    fn block_above_requires_contiguity() {
        let marked = |line: &str| line.trim_start().starts_with("#'");
        let lines = ["#' stray", "", "#' one", "#' two", "f <- function() {"];
        assert_eq!(block_above(&lines, 4, marked), Some(2..4));

        let gap = ["#' one", "", "f <- function() {"];
        assert_eq!(block_above(&gap, 2, marked), None);
        assert_eq!(block_above(&gap, 0, marked), None);
    }

    #[test]
    fn content_before_first_header_is_dropped() {
        let mut scanner = SectionScanner::new();
        scanner.feed(DocLine::Content("orphan".to_string()));
        assert_eq!(scanner.state(), ScanState::InBlock);
        scanner.feed(DocLine::Header {
            section: Section::Returns,
            inline: None,
        });
        scanner.feed(DocLine::Content("INTEGER".to_string()));
        assert_eq!(scanner.state(), ScanState::InSection(Section::Returns));

        let sections = scanner.finish();
        assert_eq!(sections.returns.as_deref(), Some("INTEGER"));
        assert!(sections.description.is_none());
    }

    #[test]
    fn explicit_empty_section_is_present() {
        let mut scanner = SectionScanner::new();
        scanner.feed(DocLine::Header {
            section: Section::Parameters,
            inline: None,
        });
        assert_eq!(scanner.finish().parameters.as_deref(), Some(""));
    }

    #[test]
    fn implicit_section_needs_content() {
        let mut blank = SectionScanner::opened_at(Section::Description);
        blank.feed(DocLine::Content("   ".to_string()));
        assert!(blank.finish().description.is_none());

        let mut filled = SectionScanner::opened_at(Section::Description);
        filled.feed(DocLine::Content("Adds numbers.".to_string()));
        assert_eq!(filled.finish().description.as_deref(), Some("Adds numbers."));
    }

    #[test]
    fn repeated_headers_accumulate() {
        let mut scanner = SectionScanner::opened_at(Section::Description);
        for param in ["@param x first", "@param y second"] {
            scanner.feed(DocLine::Header {
                section: Section::Parameters,
                inline: Some(param.to_string()),
            });
        }
        scanner.feed(DocLine::Content("  continued".to_string()));
        let sections = scanner.finish();
        assert_eq!(
            sections.parameters.as_deref(),
            Some("@param x first\n@param y second\n  continued")
        );
    }

    #[test]
    fn first_name_wins() {
        let mut scanner = SectionScanner::new();
        scanner.feed(DocLine::Name("  ".to_string()));
        scanner.feed(DocLine::Name("Revenue".to_string()));
        scanner.feed(DocLine::Name("Other".to_string()));
        assert_eq!(scanner.finish().name.as_deref(), Some("Revenue"));
    }
}
