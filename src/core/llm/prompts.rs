use tera::{Context, Tera};

use crate::config::DetailLevel;
use crate::error::Result;
use crate::core::languages::FileKind;

const GENERATE_TEMPLATE: &str = r#"You are a technical documentation expert specializing in {{ language }}.

Write {{ standard }} documentation for the {{ language }} code below.

REQUIREMENTS:
{{ requirements }}

DETAIL LEVEL ({{ detail }}):
{{ density }}

CODE TO DOCUMENT:
{{ code }}

{{ output }}"#;

const UPDATE_TEMPLATE: &str = r#"You are a technical documentation expert specializing in {{ language }}.

The existing documentation below does not meet the {{ standard }} standard. Fix it.

EXISTING DOCUMENTATION:
{{ existing }}

CODE BEING DOCUMENTED:
{{ code }}

REQUIREMENTS:
{{ requirements }}

DETAIL LEVEL ({{ detail }}):
{{ density }}

INSTRUCTIONS:
Keep whatever in the existing documentation is accurate. Correct the format and
structure, add every missing section, and make the examples realistic.

{{ output }}"#;

const NUMPY_REQUIREMENTS: &str = r#"Follow the NumPy docstring standard exactly:

Short one-line summary.

Extended description of behaviour, when it adds information.

Parameters
----------
param_name : type
    Description, continuation lines indented 4 spaces.
other_param : type, optional
    Mark optional parameters as optional.

Returns
-------
return_type
    What is returned, with its type and structure.

Raises
------
ExceptionType
    When the exception is raised (only if the code raises).

Examples
--------
>>> function_name(arg1, arg2)
expected_output

Write "None" under Parameters when there are no parameters. Use accurate types."#;

const SQL_REQUIREMENTS: &str = r#"Use SQL line comments (-- on every line) in exactly this structure:

-- # Function or Query Name
--
-- ## Description
-- What the query or routine does, including side effects (INSERT, UPDATE, DELETE).
--
-- ## Parameters
-- - `parameter_name` (TYPE): description, or "None" when there are none
--
-- ## Returns
-- - TYPE: description of the result set or return value
--
-- ## Example
-- A realistic invocation."#;

const ROXYGEN_REQUIREMENTS: &str = r#"Use Roxygen2 comments (#' on every line) in exactly this structure:

#' Short title on one line
#'
#' Description of what the function does and any notable behaviour.
#'
#' @param param_name Description including the expected type. Continuation
#'   lines are indented 2 spaces.
#' @return Type and structure of the return value.
#' @examples
#' result <- function_name(arg1, arg2)
#' @export

Only add @export for functions meant to be exported. Follow R community conventions."#;

/// Renders generation and repair prompts for each documentation standard
pub struct PromptBuilder {
    tera: Tera,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![("generate", GENERATE_TEMPLATE), ("update", UPDATE_TEMPLATE)])?;
        Ok(Self { tera })
    }

    /// Prompt asking for fresh documentation of `code`
    pub fn generate_prompt(&self, kind: FileKind, detail: DetailLevel, code: &str) -> Result<String> {
        let context = base_context(kind, detail, code);
        Ok(self.tera.render("generate", &context)?)
    }

    /// Prompt asking for `existing` documentation to be repaired
    pub fn update_prompt(
        &self,
        kind: FileKind,
        detail: DetailLevel,
        existing: &str,
        code: &str,
    ) -> Result<String> {
        let mut context = base_context(kind, detail, code);
        context.insert("existing", existing);
        Ok(self.tera.render("update", &context)?)
    }
}

fn base_context(kind: FileKind, detail: DetailLevel, code: &str) -> Context {
    let mut context = Context::new();
    context.insert("language", kind.language_name());
    context.insert("standard", kind.standard_name());
    context.insert("requirements", requirements(kind));
    context.insert("output", output_instructions(kind));
    context.insert("detail", &detail.to_string());
    context.insert("density", density(detail));
    context.insert("code", code);
    context
}

fn requirements(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Structured => NUMPY_REQUIREMENTS,
        FileKind::SingleUnit => SQL_REQUIREMENTS,
        FileKind::PatternBrace => ROXYGEN_REQUIREMENTS,
    }
}

fn output_instructions(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Structured => {
            "Return ONLY the docstring text (what goes between the triple quotes), without the quotes and without a code fence."
        }
        FileKind::SingleUnit => {
            "Return ONLY the comment lines (each starting with --), ready to be placed at the top of the file."
        }
        FileKind::PatternBrace => {
            "Return ONLY the Roxygen2 lines (each starting with #'), ready to be placed directly above the function."
        }
    }
}

fn density(detail: DetailLevel) -> &'static str {
    match detail {
        DetailLevel::Minimal => {
            "Keep every required section but limit each to one or two short lines. Give a single example."
        }
        DetailLevel::Concise => {
            "Cover every required section with brief, precise sentences and one realistic example."
        }
        DetailLevel::Verbose => {
            "Explain behaviour, edge cases and error conditions in depth, and give several examples."
        }
    }
}
