//! Documentation injection over an immutable view of the original lines
//!
//! Every target is first resolved to a splice against the unmodified file.
//! Splices are then applied from the bottom of the file upwards, so no splice
//! ever needs an offset adjusted for an earlier one.

use tracing::debug;

use crate::error::{DocstampError, Result};
use super::languages::FileKind;
use super::parser::{split_lines, CodeItem};

/// Replace lines `start..end` (0-based, half-open) of the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub lines: Vec<String>,
}

impl Splice {
    pub fn insert(at: usize, lines: Vec<String>) -> Self {
        Self::replace(at, at, lines)
    }

    pub fn replace(start: usize, end: usize, lines: Vec<String>) -> Self {
        Self { start, end, lines }
    }

    /// End inserted lines with `\r` when the line they land on does
    fn with_line_ending_of(mut self, original: &[&str]) -> Self {
        let anchor = original
            .get(self.start)
            .or_else(|| self.start.checked_sub(1).and_then(|row| original.get(row)));
        if anchor.map_or(false, |line| line.ends_with('\r')) {
            for line in self.lines.iter_mut().filter(|line| !line.ends_with('\r')) {
                line.push('\r');
            }
        }
        self
    }
}

/// Documentation to install for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionTarget {
    pub item: CodeItem,
    pub documentation: String,
}

impl InjectionTarget {
    pub fn new(item: CodeItem, documentation: impl Into<String>) -> Self {
        Self {
            item,
            documentation: documentation.into(),
        }
    }
}

/// Lines of a file plus whether it ended with a newline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl LineBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: split_lines(text).into_iter().map(str::to_string).collect(),
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Apply splices planned against the buffer's current contents.
    ///
    /// Splices are applied highest `start` first; overlapping or out of range
    /// splices are rejected before anything changes.
    pub fn apply(&mut self, splices: Vec<Splice>) -> std::result::Result<(), String> {
        let ordered = ordered_descending(splices);

        let mut floor = self.lines.len();
        for splice in &ordered {
            if splice.start > splice.end {
                return Err(format!("inverted splice {}..{}", splice.start, splice.end));
            }
            if splice.end > floor {
                return if floor == self.lines.len() {
                    Err(format!(
                        "splice {}..{} is outside the {} line file",
                        splice.start, splice.end, floor
                    ))
                } else {
                    Err(format!("splice {}..{} overlaps a later splice", splice.start, splice.end))
                };
            }
            floor = splice.start;
        }

        for splice in ordered {
            self.lines.splice(splice.start..splice.end, splice.lines);
        }
        Ok(())
    }

    pub fn into_text(self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }
}

/// Sort splices so the one starting lowest in the file comes last
pub fn ordered_descending(mut splices: Vec<Splice>) -> Vec<Splice> {
    splices.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    splices
}

pub(crate) fn corruption(kind: FileKind, reason: impl Into<String>) -> DocstampError {
    DocstampError::InjectionCorruption {
        kind,
        reason: reason.into(),
    }
}

/// Install documentation for every target and return the rewritten text.
///
/// Targets may come in any order; a later target for the same `line_start`
/// replaces an earlier one. The result is checked before it is returned and
/// must not be persisted on error.
pub fn inject(content: &str, targets: &[InjectionTarget], kind: FileKind) -> Result<String> {
    let targets = latest_per_line(targets);
    if targets.is_empty() {
        return Ok(content.to_string());
    }

    let original = split_lines(content);
    let splices: Vec<Splice> = kind
        .front_end()
        .plan_splices(content, &targets)?
        .into_iter()
        .map(|splice| splice.with_line_ending_of(&original))
        .collect();
    debug!("Applying {} splice(s) to {} source", splices.len(), kind);

    let mut buffer = LineBuffer::from_text(content);
    buffer.apply(splices).map_err(|reason| corruption(kind, reason))?;
    let rewritten = buffer.into_text();

    kind.front_end().verify(&rewritten)?;
    Ok(rewritten)
}

fn latest_per_line(targets: &[InjectionTarget]) -> Vec<InjectionTarget> {
    let mut unique: Vec<InjectionTarget> = Vec::with_capacity(targets.len());
    for target in targets {
        match unique
            .iter_mut()
            .find(|kept| kept.item.line_start == target.item.line_start)
        {
            Some(kept) => *kept = target.clone(),
            None => unique.push(target.clone()),
        }
    }
    unique.sort_by_key(|target| target.item.line_start);
    unique
}
