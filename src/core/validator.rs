use std::fmt;

use serde::Serialize;

use super::doc_parser::{Discovery, DocumentationRecord};
use super::languages::FileKind;

/// Minimum description length after trimming
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Result of checking documentation against its kind's standard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    fn flag(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "VALID")
        } else {
            write!(f, "INVALID ({} issues)", self.issues.len())
        }
    }
}

/// Run every check for the record's kind. All checks run; none short-circuits.
pub fn validate(discovery: &Discovery) -> ValidationResult {
    let Discovery::Found(record) = discovery else {
        return ValidationResult {
            issues: vec!["No documentation found.".to_string()],
        };
    };

    let mut result = ValidationResult::default();
    match record.kind {
        FileKind::Structured => validate_numpy(record, &mut result),
        FileKind::SingleUnit => validate_sql(record, &mut result),
        FileKind::PatternBrace => validate_roxygen(record, &mut result),
    }
    result
}

fn is_blank(section: &Option<String>) -> bool {
    section.as_deref().map_or(true, |text| text.trim().is_empty())
}

fn check_description(record: &DocumentationRecord, missing: &str, result: &mut ValidationResult) {
    match record.description.as_deref().map(str::trim) {
        None | Some("") => result.flag(missing),
        Some(text) if text.chars().count() < MIN_DESCRIPTION_LEN => {
            result.flag(format!(
                "Description is too short (minimum {} characters)",
                MIN_DESCRIPTION_LEN
            ));
        }
        Some(_) => {}
    }
}

fn validate_numpy(record: &DocumentationRecord, result: &mut ValidationResult) {
    let raw = record.raw_text.as_str();
    let structured = raw.trim_start().starts_with("\"\"\"")
        && ["Parameters", "----------", "Returns", "-------"]
            .iter()
            .all(|marker| raw.contains(marker));
    if !structured {
        result.flag("Documentation does not follow NumPy docstring standard structure");
    }

    if is_blank(&record.name) {
        result.flag("Missing function/class name");
    }

    check_description(record, "Missing description section", result);

    match record.parameters.as_deref() {
        None => result.flag("Missing Parameters section"),
        Some(params) if !params.contains(':') && !params.contains("None") => {
            result.flag("Parameters section should follow 'param_name : type' format");
        }
        Some(_) => {}
    }

    match record.returns.as_deref() {
        None => result.flag("Missing Returns section"),
        Some(returns) if returns.trim().is_empty() => result.flag("Empty Returns section"),
        Some(_) => {}
    }

    if raw.contains("Parameters") && !raw.contains("----------") {
        result.flag("Parameters section missing dashed underline (----------)");
    }
    if raw.contains("Returns") && !raw.contains("-------") {
        result.flag("Returns section missing dashed underline (-------)");
    }
}

fn validate_sql(record: &DocumentationRecord, result: &mut ValidationResult) {
    let lowered = record.raw_text.to_lowercase();
    let structured = ["-- #", "-- ## description", "-- ## parameters", "-- ## returns", "-- ## example"]
        .iter()
        .all(|marker| lowered.contains(marker));
    if !structured {
        result.flag("Documentation does not follow SQL markdown standard structure");
    }

    if is_blank(&record.name) {
        result.flag("Missing function/query name (-- # Header)");
    }

    check_description(record, "Missing description section (-- ## Description)", result);

    let sections = [
        ("parameters", "Missing parameters section (-- ## Parameters)", &record.parameters),
        ("returns", "Missing returns section (-- ## Returns)", &record.returns),
        ("example", "Missing example section (-- ## Example)", &record.examples),
    ];
    for (label, missing, section) in sections {
        match section.as_deref() {
            None => result.flag(missing),
            Some(text) if text.trim().is_empty() => result.flag(format!("Empty {} section", label)),
            Some(_) => {}
        }
    }
}

fn validate_roxygen(record: &DocumentationRecord, result: &mut ValidationResult) {
    let raw = record.raw_text.as_str();
    let structured = ["#'", "@param", "@return"].iter().all(|tag| raw.contains(tag))
        && raw
            .lines()
            .all(|line| line.trim().is_empty() || line.trim().starts_with("#'"));
    if !structured {
        result.flag("Documentation does not follow Roxygen2 standard structure");
    }

    if is_blank(&record.name) {
        result.flag("Missing function name (could not extract from code)");
    }

    check_description(record, "Missing description section", result);

    match record.parameters.as_deref() {
        None => result.flag("Missing @param tags"),
        Some(params) if !params.contains("@param") => {
            result.flag("Parameters should use @param tag format");
        }
        Some(_) => {}
    }

    match record.returns.as_deref() {
        None => result.flag("Missing @return tag"),
        Some(returns) if returns.trim().is_empty() => result.flag("Empty @return section"),
        Some(_) => {}
    }

    if let Some(number) = raw
        .lines()
        .position(|line| !line.trim().is_empty() && !line.trim().starts_with("#'"))
    {
        result.flag(format!("Line {} does not start with #' marker", number + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: FileKind, raw_text: &str) -> DocumentationRecord {
        DocumentationRecord {
            kind,
            name: Some("subject".to_string()),
            description: Some("A description long enough.".to_string()),
            parameters: Some("x : int".to_string()),
            returns: Some("int".to_string()),
            examples: Some("example()".to_string()),
            raw_text: raw_text.to_string(),
        }
    }

    const NUMPY_RAW: &str = "\"\"\"\nA description long enough.\n\nParameters\n----------\nx : int\n\nReturns\n-------\nint\n\"\"\"";
    const SQL_RAW: &str = "-- # subject\n-- ## Description\n-- A description long enough.\n-- ## Parameters\n-- x\n-- ## Returns\n-- int\n-- ## Example\n-- SELECT 1;";
    const ROXYGEN_RAW: &str = "#' A description long enough.\n#' @param x value\n#' @return int";

    fn has_issue(result: &ValidationResult, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        result.issues.iter().any(|issue| issue.to_lowercase().contains(&needle))
    }

    #[test]
    fn not_found_has_a_single_issue() {
        let result = validate(&Discovery::NotFound);
        assert!(!result.is_valid());
        assert_eq!(result.issues, vec!["No documentation found.".to_string()]);
    }

    #[test]
    fn complete_records_are_valid() {
        let mut roxygen = record(FileKind::PatternBrace, ROXYGEN_RAW);
        roxygen.parameters = Some("@param x value".to_string());

        for complete in [
            record(FileKind::Structured, NUMPY_RAW),
            record(FileKind::SingleUnit, SQL_RAW),
            roxygen,
        ] {
            let result = validate(&Discovery::Found(complete.clone()));
            assert!(result.is_valid(), "{:?}: {:?}", complete.kind, result.issues);
            assert_eq!(result.to_string(), "VALID");
        }
    }

    #[test]
    fn sql_missing_parameters_is_reported() {
        let mut sql = record(FileKind::SingleUnit, SQL_RAW);
        sql.parameters = None;
        let result = validate(&Discovery::Found(sql));
        assert!(!result.is_valid());
        assert!(has_issue(&result, "missing parameters section"));
    }

    #[test]
    fn sql_checks_every_section() {
        let mut sql = record(FileKind::SingleUnit, "-- # subject");
        sql.name = None;
        sql.description = Some("short".to_string());
        sql.returns = Some("  ".to_string());
        sql.examples = None;
        let result = validate(&Discovery::Found(sql));
        assert_eq!(
            result.issues,
            vec![
                "Documentation does not follow SQL markdown standard structure",
                "Missing function/query name (-- # Header)",
                "Description is too short (minimum 10 characters)",
                "Empty returns section",
                "Missing example section (-- ## Example)",
            ]
        );
        assert_eq!(result.to_string(), "INVALID (5 issues)");
    }

    #[test]
    fn numpy_requires_shape_and_underlines() {
        let mut numpy = record(FileKind::Structured, "\"\"\"\nParameters\nReturns\n-------\n\"\"\"");
        numpy.parameters = Some("x is a number".to_string());
        numpy.returns = None;
        let result = validate(&Discovery::Found(numpy));
        assert!(has_issue(&result, "NumPy docstring standard structure"));
        assert!(has_issue(&result, "'param_name : type' format"));
        assert!(has_issue(&result, "Missing Returns section"));
        assert!(has_issue(&result, "Parameters section missing dashed underline"));
        assert!(!has_issue(&result, "Returns section missing dashed underline"));
    }

    #[test]
    fn numpy_accepts_none_parameters() {
        let mut numpy = record(FileKind::Structured, NUMPY_RAW);
        numpy.parameters = Some("None".to_string());
        assert!(validate(&Discovery::Found(numpy)).is_valid());
    }

    #[test]
    fn roxygen_reports_first_unmarked_line() {
        let mut roxygen = record(FileKind::PatternBrace, "#' Title\nstray\n#' @param x v\nalso stray\n#' @return y");
        roxygen.parameters = Some("x value".to_string());
        roxygen.returns = Some(String::new());
        let result = validate(&Discovery::Found(roxygen));
        assert!(has_issue(&result, "Roxygen2 standard structure"));
        assert!(has_issue(&result, "Parameters should use @param tag format"));
        assert!(has_issue(&result, "Empty @return section"));
        let marker_issues: Vec<&String> = result.issues.iter().filter(|i| i.contains("#' marker")).collect();
        assert_eq!(marker_issues, vec!["Line 2 does not start with #' marker"]);
    }

    #[test]
    fn missing_description_differs_from_short() {
        let mut numpy = record(FileKind::Structured, NUMPY_RAW);
        numpy.description = None;
        let result = validate(&Discovery::Found(numpy));
        assert!(has_issue(&result, "Missing description section"));
        assert!(!has_issue(&result, "too short"));
    }
}
